//! SeisComP XML export for catalog dispatch (`scdb -i` reads this format).

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::domain::{EventId, SeismicEvent};

pub const SCML_NAMESPACE: &str = "http://geofon.gfz-potsdam.de/ns/seiscomp3-schema/0.12";
const SCML_VERSION: &str = "0.12";

#[derive(Debug, thiserror::Error)]
pub enum ScmlError {
    #[error("event {0} has no epicenter to export")]
    MissingEpicenter(EventId),
    #[error("unable to write SCML document: {0}")]
    Write(String),
}

/// Renders one event as an SCML `EventParameters` document with a single
/// origin and, when known, its preferred magnitude.
pub fn to_scml(event: &SeismicEvent, event_id: &EventId) -> Result<Vec<u8>, ScmlError> {
    let epicenter = event
        .epicenter
        .ok_or_else(|| ScmlError::MissingEpicenter(event_id.clone()))?;
    let origin_id = format!("Origin/{event_id}");
    let magnitude_id = format!("Magnitude/{event_id}");
    let magnitude = event.magnitude.filter(|value| value.is_finite());

    let mut writer = ScmlWriter::new();
    writer.emit(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.open(
        "seiscomp",
        &[("xmlns", SCML_NAMESPACE), ("version", SCML_VERSION)],
    )?;
    writer.open("EventParameters", &[])?;

    writer.open("origin", &[("publicID", origin_id.as_str())])?;
    writer.value_element(
        "time",
        &event
            .origin_time
            .format("%Y-%m-%dT%H:%M:%S%.6fZ")
            .to_string(),
    )?;
    writer.value_element("latitude", &epicenter.latitude.to_string())?;
    writer.value_element("longitude", &epicenter.longitude.to_string())?;
    if let Some(depth) = event.depth_km.filter(|value| value.is_finite()) {
        writer.value_element("depth", &depth.to_string())?;
    }
    writer.creation_info(&event.agency)?;
    if let Some(magnitude) = magnitude {
        writer.open("magnitude", &[("publicID", magnitude_id.as_str())])?;
        writer.value_element("magnitude", &magnitude.to_string())?;
        writer.text_element("type", "M")?;
        writer.close("magnitude")?;
    }
    writer.close("origin")?;

    writer.open("event", &[("publicID", event_id.as_str())])?;
    writer.text_element("preferredOriginID", &origin_id)?;
    if magnitude.is_some() {
        writer.text_element("preferredMagnitudeID", &magnitude_id)?;
    }
    writer.creation_info(&event.agency)?;
    if let Some(place) = &event.place {
        writer.open("description", &[])?;
        writer.text_element("text", place)?;
        writer.text_element("type", "region name")?;
        writer.close("description")?;
    }
    writer.text_element("originReference", &origin_id)?;
    writer.close("event")?;

    writer.close("EventParameters")?;
    writer.close("seiscomp")?;
    Ok(writer.finish())
}

struct ScmlWriter {
    inner: Writer<Vec<u8>>,
}

impl ScmlWriter {
    fn new() -> Self {
        Self {
            inner: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn emit(&mut self, event: Event<'_>) -> Result<(), ScmlError> {
        self.inner
            .write_event(event)
            .map_err(|err| ScmlError::Write(err.to_string()))
    }

    fn open(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), ScmlError> {
        let mut start = BytesStart::new(name);
        for attribute in attributes {
            start.push_attribute(*attribute);
        }
        self.emit(Event::Start(start))
    }

    fn close(&mut self, name: &str) -> Result<(), ScmlError> {
        self.emit(Event::End(BytesEnd::new(name)))
    }

    fn text_element(&mut self, name: &str, text: &str) -> Result<(), ScmlError> {
        self.open(name, &[])?;
        self.emit(Event::Text(BytesText::new(text)))?;
        self.close(name)
    }

    /// `<name><value>..</value></name>`, the SCML real-quantity shape.
    fn value_element(&mut self, name: &str, value: &str) -> Result<(), ScmlError> {
        self.open(name, &[])?;
        self.text_element("value", value)?;
        self.close(name)
    }

    fn creation_info(&mut self, agency: &str) -> Result<(), ScmlError> {
        self.open("creationInfo", &[])?;
        self.text_element("agencyID", agency)?;
        self.close("creationInfo")
    }

    fn finish(self) -> Vec<u8> {
        self.inner.into_inner()
    }
}
