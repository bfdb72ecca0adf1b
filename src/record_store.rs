//! Typed operations over the persisted record document.
//!
//! Every mutating call reads the whole [`Document`], appends to exactly one
//! collection and writes the whole document back. There is no update or
//! delete, and no locking: two stores over the same backend follow
//! last-write-wins.

use chrono::Utc;
use log::{info, warn};
use serde_json::Value as JsonValue;

use crate::app_response::AppResponse;
use crate::local_db_model::{
    next_id, Document, HardwareCondition, HardwareItem, LooseId, Report, ReportContent, Request,
    RequestSummary, User, DEFAULT_ROLE, DEFAULT_STATUS, REPORT_KIND_AD_HOC,
};
use crate::storage::DocumentStorage;
use crate::store_config::DEFAULT_STORAGE_KEY;

/// Parses a persisted document.
///
/// Returns the empty document and `true` (reinitialize) when the value is
/// missing, is not JSON, or is JSON but not an object. A JSON object whose
/// records cannot be read is an error instead: it still holds data, so it
/// is never replaced.
pub fn parse_document_or_default(raw: Option<&str>) -> Result<(Document, bool), AppResponse> {
    let Some(raw) = raw else {
        return Ok((Document::default(), true));
    };

    let value = match serde_json::from_str::<JsonValue>(raw) {
        Ok(value @ JsonValue::Object(_)) => value,
        Ok(_) => {
            warn!("Persisted document is not a JSON object, reinitializing");
            return Ok((Document::default(), true));
        }
        Err(e) => {
            warn!("Persisted document is not valid JSON, reinitializing: {}", e);
            return Ok((Document::default(), true));
        }
    };

    match serde_json::from_value::<Document>(value) {
        Ok(doc) => Ok((doc, false)),
        Err(e) => {
            warn!("Persisted document has unreadable records, leaving it untouched: {}", e);
            Err(AppResponse::SerializationError(format!("Persisted document has unreadable records: {}", e)))
        }
    }
}

pub struct RecordStore<S: DocumentStorage> {
    storage: S,
    key: String,
}

impl<S: DocumentStorage> RecordStore<S> {
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self { storage, key: key.into() }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Returns the current document.
    ///
    /// An absent or non-JSON value is replaced by a freshly persisted empty
    /// document. Errors come from a failing storage backend, or from a JSON
    /// document whose records cannot be read (which is left as is).
    pub fn load(&self) -> Result<Document, AppResponse> {
        let raw = self.storage.read(&self.key)?;
        let (doc, reinitialized) = parse_document_or_default(raw.as_deref())?;
        if reinitialized {
            info!("Initializing empty record document under '{}'", self.key);
            self.save(&doc)?;
        }
        Ok(doc)
    }

    pub fn save(&self, doc: &Document) -> Result<(), AppResponse> {
        let json = serde_json::to_string(doc)?;
        self.storage.write(&self.key, &json)
    }

    pub fn create_user(&self, name: &str, email: &str) -> Result<User, AppResponse> {
        let mut doc = self.load()?;
        let user = User {
            id: next_id(&doc.users)?,
            name: name.to_string(),
            email: email.to_string(),
            phone: String::new(),
            role: DEFAULT_ROLE.to_string(),
            created_at: Utc::now(),
        };
        doc.users.push(user.clone());
        self.save(&doc)?;
        Ok(user)
    }

    /// All users, ascending by id.
    pub fn list_users(&self) -> Result<Vec<User>, AppResponse> {
        let mut users = self.load()?.users;
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    /// Records a pickup request. `user_id` is stored as given, even if no
    /// such user exists.
    pub fn create_request(&self, user_id: impl Into<LooseId>, address: &str) -> Result<Request, AppResponse> {
        let mut doc = self.load()?;
        let request = Request {
            id: next_id(&doc.requests)?,
            user_id: user_id.into(),
            address: address.to_string(),
            lat: None,
            lon: None,
            status: DEFAULT_STATUS.to_string(),
            notes: String::new(),
            created_at: Utc::now(),
        };
        doc.requests.push(request.clone());
        self.save(&doc)?;
        Ok(request)
    }

    pub fn list_requests_by_user(&self, user_id: impl Into<LooseId>) -> Result<Vec<RequestSummary>, AppResponse> {
        let user_id = user_id.into();
        let doc = self.load()?;
        Ok(doc
            .requests
            .iter()
            .filter(|r| r.user_id.matches(&user_id))
            .map(|r| doc.summarize(r))
            .collect())
    }

    pub fn list_all_requests(&self) -> Result<Vec<RequestSummary>, AppResponse> {
        let doc = self.load()?;
        Ok(doc.requests.iter().map(|r| doc.summarize(r)).collect())
    }

    pub fn add_hardware(
        &self,
        request_id: impl Into<LooseId>,
        kind: &str,
        brand: Option<&str>,
        model: Option<&str>,
        condition: Option<HardwareCondition>,
    ) -> Result<HardwareItem, AppResponse> {
        let mut doc = self.load()?;
        let item = HardwareItem {
            id: next_id(&doc.hardwares)?,
            request_id: request_id.into(),
            kind: kind.to_string(),
            brand: brand.map(str::to_string),
            model: model.map(str::to_string),
            condition: condition.unwrap_or_default(),
            weight_kg: None,
            recyclable: false,
            created_at: Utc::now(),
        };
        doc.hardwares.push(item.clone());
        self.save(&doc)?;
        Ok(item)
    }

    pub fn list_hardwares_by_request(&self, request_id: impl Into<LooseId>) -> Result<Vec<HardwareItem>, AppResponse> {
        let request_id = request_id.into();
        Ok(self
            .load()?
            .hardwares
            .into_iter()
            .filter(|h| h.request_id.matches(&request_id))
            .collect())
    }

    /// Snapshots hardware counts per condition across every request, plus
    /// the total number of requests, into a new report.
    pub fn generate_report(&self, generated_by: Option<LooseId>) -> Result<Report, AppResponse> {
        let mut doc = self.load()?;
        let mut summary = ReportContent {
            total_requests: doc.requests.len() as u64,
            ..ReportContent::default()
        };
        for item in &doc.hardwares {
            *summary
                .hardwares_by_condition
                .entry(item.condition.as_str().to_string())
                .or_insert(0) += 1;
        }

        let report = Report {
            id: next_id(&doc.reports)?,
            kind: REPORT_KIND_AD_HOC.to_string(),
            content: serde_json::to_value(&summary)?,
            generated_by,
            generated_at: Utc::now(),
        };
        doc.reports.push(report.clone());
        self.save(&doc)?;
        Ok(report)
    }

    /// All reports, newest (highest id) first.
    pub fn list_reports(&self) -> Result<Vec<Report>, AppResponse> {
        let mut reports = self.load()?.reports;
        reports.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(reports)
    }

    pub fn get_report(&self, id: impl Into<LooseId>) -> Result<Option<Report>, AppResponse> {
        let id = id.into();
        Ok(self
            .load()?
            .reports
            .into_iter()
            .find(|r| LooseId::from(r.id).matches(&id)))
    }

    /// Replaces everything with the empty document. Irreversible.
    pub fn reset_db(&self) -> Result<(), AppResponse> {
        warn!("Resetting record document under '{}'", self.key);
        self.save(&Document::default())
    }
}
