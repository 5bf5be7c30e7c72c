use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::info;

use super::impact::ImpactReport;

/// Outbound alert hook (outbox folder, sendmail, test doubles).
pub trait AlertNotifier: Send + Sync {
    fn notify(&self, report: &ImpactReport) -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("alert has no recipients")]
    NoRecipients,
    #[error("unable to write alert to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("alert transport `{command}` failed: {detail}")]
    Transport { command: String, detail: String },
}

/// Sender, recipients and subject shared by every alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEnvelope {
    pub from: String,
    pub recipients: Vec<String>,
    pub subject: String,
}

/// Report rendered for delivery; the HTML body carries the facility table.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedAlert {
    pub subject: String,
    pub text: String,
    pub html: String,
}

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

pub fn render_report(report: &ImpactReport, subject: &str) -> RenderedAlert {
    let magnitude = format_magnitude(report.magnitude);
    let time = report.origin_time.format(TIME_FORMAT);

    let mut text = String::new();
    writeln!(text, "Event: {}", report.event_id).expect("write event id");
    writeln!(text, "Origin time: {time}").expect("write time");
    writeln!(text, "Magnitude: {magnitude}").expect("write magnitude");
    writeln!(
        text,
        "Epicenter: {:.4}, {:.4}",
        report.epicenter.latitude, report.epicenter.longitude
    )
    .expect("write epicenter");
    if let Some(place) = &report.place {
        writeln!(text, "Location: {place}").expect("write place");
    }
    text.push('\n');

    let name_width = report
        .impacts
        .iter()
        .map(|impact| impact.facility.chars().count())
        .chain(std::iter::once("Facility".len()))
        .max()
        .unwrap_or_default();
    writeln!(text, "{:<name_width$}  Distance (km)", "Facility").expect("write header");
    for impact in &report.impacts {
        writeln!(
            text,
            "{:<name_width$}  {:>13.1}",
            impact.facility, impact.distance_km
        )
        .expect("write row");
    }

    let mut html = String::new();
    writeln!(html, "<h1>{}</h1>", escape_html(subject)).expect("write heading");
    html.push_str("<ul>");
    writeln!(html, "<li>Event: {}</li>", escape_html(report.event_id.as_str()))
        .expect("write event id");
    writeln!(html, "<li>Origin time: {time}</li>").expect("write time");
    writeln!(html, "<li>Magnitude: {magnitude}</li>").expect("write magnitude");
    writeln!(
        html,
        "<li>Epicenter: {:.4}, {:.4}</li>",
        report.epicenter.latitude, report.epicenter.longitude
    )
    .expect("write epicenter");
    if let Some(place) = &report.place {
        writeln!(html, "<li>Location: {}</li>", escape_html(place)).expect("write place");
    }
    html.push_str("</ul>");

    html.push_str(&impact_table_html(report));

    RenderedAlert {
        subject: format!("{subject}: M{magnitude} {}", report.event_id),
        text,
        html,
    }
}

/// Facility rows in distance order, as an HTML table.
pub fn impact_table_html(report: &ImpactReport) -> String {
    let mut html = String::from(
        "<table border=\"1\"><thead><tr><th>Facility</th><th>Distance (km)</th></tr></thead><tbody>",
    );
    for impact in &report.impacts {
        writeln!(
            html,
            "<tr><td>{}</td><td>{:.1}</td></tr>",
            escape_html(&impact.facility),
            impact.distance_km
        )
        .expect("write table row");
    }
    html.push_str("</tbody></table>");
    html
}

/// Operator-supplied HTML body.
///
/// `{{ name }}` placeholders take escaped event fields: `subject`, `event_id`,
/// `origin_time`, `magnitude`, `latitude`, `longitude`, `place` and `radius_km`.
/// `{{ impact_table }}` takes the facility table markup. Unknown names are left as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertTemplate {
    html: String,
}

impl AlertTemplate {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        fs::read_to_string(path).map(Self::new)
    }

    pub fn render(&self, report: &ImpactReport, subject: &str) -> String {
        let mut html = String::with_capacity(self.html.len());
        let mut rest = self.html.as_str();

        while let Some(open) = rest.find("{{") {
            html.push_str(&rest[..open]);
            let inner = &rest[open + 2..];
            let Some(close) = inner.find("}}") else {
                html.push_str(&rest[open..]);
                rest = "";
                break;
            };

            match placeholder_value(inner[..close].trim(), report, subject) {
                Some(value) => html.push_str(&value),
                None => html.push_str(&rest[open..open + close + 4]),
            }
            rest = &inner[close + 2..];
        }

        html.push_str(rest);
        html
    }
}

fn placeholder_value(name: &str, report: &ImpactReport, subject: &str) -> Option<String> {
    let value = match name {
        "subject" => escape_html(subject),
        "event_id" => escape_html(report.event_id.as_str()),
        "origin_time" => report.origin_time.format(TIME_FORMAT).to_string(),
        "magnitude" => format_magnitude(report.magnitude),
        "latitude" => format!("{:.4}", report.epicenter.latitude),
        "longitude" => format!("{:.4}", report.epicenter.longitude),
        "place" => report.place.as_deref().map(escape_html).unwrap_or_default(),
        "radius_km" => report
            .radius_km
            .map(|radius| format!("{radius:.0}"))
            .unwrap_or_default(),
        "impact_table" => impact_table_html(report),
        _ => return None,
    };
    Some(value)
}

/// Built-in rendering, with the HTML body swapped for `template` when one is configured.
pub fn render_alert(
    report: &ImpactReport,
    subject: &str,
    template: Option<&AlertTemplate>,
) -> RenderedAlert {
    let mut alert = render_report(report, subject);
    if let Some(template) = template {
        alert.html = template.render(report, subject);
    }
    alert
}

/// RFC 5322 message with plain-text and HTML alternatives.
pub fn compose_message(envelope: &AlertEnvelope, alert: &RenderedAlert, boundary: &str) -> String {
    let mut message = String::new();
    writeln!(message, "From: {}", envelope.from).expect("write from");
    writeln!(message, "To: {}", envelope.recipients.join(", ")).expect("write to");
    writeln!(message, "Subject: {}", alert.subject).expect("write subject");
    message.push_str("MIME-Version: 1.0\n");
    writeln!(
        message,
        "Content-Type: multipart/alternative; boundary=\"{boundary}\""
    )
    .expect("write content type");
    message.push('\n');

    for (content_type, body) in [("text/plain", &alert.text), ("text/html", &alert.html)] {
        writeln!(message, "--{boundary}").expect("write boundary");
        writeln!(message, "Content-Type: {content_type}; charset=utf-8").expect("write part type");
        message.push('\n');
        message.push_str(body);
        if !body.ends_with('\n') {
            message.push('\n');
        }
    }
    writeln!(message, "--{boundary}--").expect("write closing boundary");

    message
}

/// Drops each alert as an `.eml` file into a folder picked up by an external mailer.
#[derive(Debug, Clone)]
pub struct OutboxNotifier {
    dir: PathBuf,
    envelope: AlertEnvelope,
    template: Option<AlertTemplate>,
}

impl OutboxNotifier {
    pub fn new(dir: impl Into<PathBuf>, envelope: AlertEnvelope) -> Self {
        Self {
            dir: dir.into(),
            envelope,
            template: None,
        }
    }

    pub fn with_template(mut self, template: AlertTemplate) -> Self {
        self.template = Some(template);
        self
    }
}

impl AlertNotifier for OutboxNotifier {
    fn notify(&self, report: &ImpactReport) -> Result<(), NotificationError> {
        if self.envelope.recipients.is_empty() {
            return Err(NotificationError::NoRecipients);
        }

        fs::create_dir_all(&self.dir).map_err(|source| NotificationError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let alert = render_alert(report, &self.envelope.subject, self.template.as_ref());
        let boundary = format!("quake-alert-{}", report.event_id);
        let message = compose_message(&self.envelope, &alert, &boundary);

        let path = self.dir.join(format!("{}.eml", report.event_id));
        fs::write(&path, message).map_err(|source| NotificationError::Io {
            path: path.clone(),
            source,
        })?;

        info!(event_id = %report.event_id, path = %path.display(), "alert written to outbox");
        Ok(())
    }
}

/// Pipes each alert into a sendmail-compatible command (`sendmail -t`).
#[derive(Debug, Clone)]
pub struct SendmailNotifier {
    program: String,
    args: Vec<String>,
    envelope: AlertEnvelope,
    template: Option<AlertTemplate>,
}

impl SendmailNotifier {
    /// `None` for a blank command line.
    pub fn parse(command: &str, envelope: AlertEnvelope) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
            envelope,
            template: None,
        })
    }

    pub fn with_template(mut self, template: AlertTemplate) -> Self {
        self.template = Some(template);
        self
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn transport_error(&self, detail: impl ToString) -> NotificationError {
        NotificationError::Transport {
            command: self.command_line(),
            detail: detail.to_string(),
        }
    }
}

impl AlertNotifier for SendmailNotifier {
    fn notify(&self, report: &ImpactReport) -> Result<(), NotificationError> {
        if self.envelope.recipients.is_empty() {
            return Err(NotificationError::NoRecipients);
        }

        let alert = render_alert(report, &self.envelope.subject, self.template.as_ref());
        let boundary = format!("quake-alert-{}", report.event_id);
        let message = compose_message(&self.envelope, &alert, &boundary);

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| self.transport_error(err))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(message.as_bytes())
                .map_err(|err| self.transport_error(err))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|err| self.transport_error(err))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.transport_error(format!("{} {}", output.status, stderr.trim())));
        }

        info!(
            event_id = %report.event_id,
            recipients = self.envelope.recipients.len(),
            "alert handed to mail transport"
        );
        Ok(())
    }
}

/// Transport picked at startup from configuration.
#[derive(Debug, Clone)]
pub enum MailTransport {
    Outbox(OutboxNotifier),
    Sendmail(SendmailNotifier),
}

impl AlertNotifier for MailTransport {
    fn notify(&self, report: &ImpactReport) -> Result<(), NotificationError> {
        match self {
            MailTransport::Outbox(notifier) => notifier.notify(report),
            MailTransport::Sendmail(notifier) => notifier.notify(report),
        }
    }
}

fn format_magnitude(magnitude: Option<f64>) -> String {
    match magnitude {
        Some(value) => format!("{value:.1}"),
        None => "unknown".to_string(),
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
