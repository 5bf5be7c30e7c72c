use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use super::catalog::{DispatchCommand, FileCatalog};
use super::impact::ImpactEvaluator;
use super::notify::{
    AlertEnvelope, AlertTemplate, MailTransport, OutboxNotifier, SendmailNotifier,
};
use super::orchestrator::AlertOrchestrator;
use super::registry::{FacilityRegistry, RegistryError};
use super::tiers::{TierLoadError, TierTable};
use crate::config::{AlertConfig, NotifyMode};

/// Orchestrator wired to the filesystem catalog and the configured mail transport.
pub type ConfiguredOrchestrator = AlertOrchestrator<FileCatalog, MailTransport>;

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Tiers(#[from] TierLoadError),
    #[error("sendmail command must not be blank")]
    BlankSendmailCommand,
    #[error("unable to read alert template {path}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub fn facility_registry(config: &AlertConfig) -> Result<FacilityRegistry, RegistryError> {
    match &config.facilities_csv {
        Some(path) => FacilityRegistry::from_path(path),
        None => {
            warn!("QUAKE_FACILITIES_CSV not set; using example facilities");
            Ok(FacilityRegistry::example())
        }
    }
}

pub fn tier_table(config: &AlertConfig) -> Result<TierTable, TierLoadError> {
    match &config.tiers_csv {
        Some(path) => TierTable::from_path(path),
        None => Ok(TierTable::standard()),
    }
}

pub fn impact_evaluator(config: &AlertConfig) -> Result<ImpactEvaluator, SetupError> {
    let registry = facility_registry(config)?;
    let tiers = tier_table(config)?;
    info!(
        facilities = registry.len(),
        tiers = tiers.tiers().len(),
        "facility registry loaded"
    );
    Ok(ImpactEvaluator::new(Arc::new(registry), Arc::new(tiers)))
}

pub fn mail_transport(config: &AlertConfig) -> Result<MailTransport, SetupError> {
    let notify = &config.notify;
    if notify.recipients.is_empty() {
        warn!("QUAKE_ALERT_RECIPIENTS is empty; alerts will fail to send");
    }

    let envelope = AlertEnvelope {
        from: notify.from.clone(),
        recipients: notify.recipients.clone(),
        subject: notify.subject.clone(),
    };

    let template = match &notify.template {
        Some(path) => {
            let template =
                AlertTemplate::from_path(path).map_err(|source| SetupError::Template {
                    path: path.clone(),
                    source,
                })?;
            info!(path = %path.display(), "alert template loaded");
            Some(template)
        }
        None => None,
    };

    match notify.mode {
        NotifyMode::Outbox => {
            let mut notifier = OutboxNotifier::new(notify.outbox_dir.clone(), envelope);
            if let Some(template) = template {
                notifier = notifier.with_template(template);
            }
            Ok(MailTransport::Outbox(notifier))
        }
        NotifyMode::Sendmail => {
            let mut notifier = SendmailNotifier::parse(&notify.sendmail_command, envelope)
                .ok_or(SetupError::BlankSendmailCommand)?;
            if let Some(template) = template {
                notifier = notifier.with_template(template);
            }
            Ok(MailTransport::Sendmail(notifier))
        }
    }
}

pub fn build_orchestrator(config: &AlertConfig) -> Result<ConfiguredOrchestrator, SetupError> {
    let evaluator = impact_evaluator(config)?;
    let transport = mail_transport(config)?;

    let mut catalog = FileCatalog::new(config.catalog_dir.clone());
    if let Some(dispatch) = config
        .dispatch_command
        .as_deref()
        .and_then(DispatchCommand::parse)
    {
        catalog = catalog.with_dispatch(dispatch);
    }

    Ok(AlertOrchestrator::new(
        config.agencies.iter().cloned(),
        Arc::new(catalog),
        evaluator,
        Arc::new(transport),
    ))
}
