use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use super::catalog::{CatalogError, CatalogKey, EventCatalog};
use super::domain::SeismicEvent;

/// Why an event was turned away at the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    AgencyNotAllowed,
    AlreadyRecorded,
    Unidentified,
}

impl RejectReason {
    pub fn label(&self) -> &'static str {
        match self {
            RejectReason::AgencyNotAllowed => "agency not on allow-list",
            RejectReason::AlreadyRecorded => "already recorded",
            RejectReason::Unidentified => "no usable event identifier",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Admitted(CatalogKey),
    Rejected(RejectReason),
}

/// Decides whether an event is new and comes from an allowed network.
pub struct AdmissionGate<C> {
    allowed_agencies: BTreeSet<String>,
    catalog: Arc<C>,
}

impl<C> AdmissionGate<C>
where
    C: EventCatalog + 'static,
{
    pub fn new<I, S>(allowed_agencies: I, catalog: Arc<C>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_agencies: allowed_agencies.into_iter().map(Into::into).collect(),
            catalog,
        }
    }

    /// Case-sensitive exact match.
    pub fn is_allowed(&self, agency: &str) -> bool {
        self.allowed_agencies.contains(agency)
    }

    pub fn allowed_agencies(&self) -> impl Iterator<Item = &str> {
        self.allowed_agencies.iter().map(String::as_str)
    }

    /// Asks the catalog whether a record for this event already exists.
    pub fn already_recorded(&self, event: &SeismicEvent) -> Result<bool, CatalogError> {
        match CatalogKey::for_event(event) {
            Some(key) => self.catalog.exists(&key),
            None => Ok(false),
        }
    }

    pub fn should_process(&self, event: &SeismicEvent) -> Result<bool, CatalogError> {
        Ok(matches!(self.admit(event)?, Admission::Admitted(_)))
    }

    /// The allow-list is checked first so filtered networks never touch the catalog.
    pub fn admit(&self, event: &SeismicEvent) -> Result<Admission, CatalogError> {
        if !self.is_allowed(&event.agency) {
            return Ok(Admission::Rejected(RejectReason::AgencyNotAllowed));
        }

        let key = match CatalogKey::for_event(event) {
            Some(key) => key,
            None => return Ok(Admission::Rejected(RejectReason::Unidentified)),
        };

        if self.catalog.exists(&key)? {
            return Ok(Admission::Rejected(RejectReason::AlreadyRecorded));
        }

        Ok(Admission::Admitted(key))
    }
}
