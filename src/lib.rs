//! # HardwareRevive Core
//!
//! Local record store for tracking electronic-waste collection: citizens,
//! pickup requests, hardware items collected per request, and ad-hoc
//! aggregate reports. All state is one JSON document persisted under a
//! single key in an LMDB environment on the local device.
//!
//! The crate is meant to sit under a UI. The UI calls the operations below
//! synchronously and re-queries after every mutation; there is no
//! subscription mechanism.
//!
//! ## Rust usage
//!
//! ```no_run
//! use hardware_revive_core::{AppDbState, HardwareCondition, RecordStore, StoreConfig};
//!
//! let config = StoreConfig::new("hardware_revive_data");
//! let store = RecordStore::with_key(AppDbState::init(&config)?, config.storage_key.clone());
//!
//! let user = store.create_user("Ana", "ana@example.com")?;
//! let request = store.create_request(user.id, "Av. Siempre Viva 742")?;
//! store.add_hardware(request.id, "hard drive", Some("Seagate"), None, Some(HardwareCondition::Reusable))?;
//! let report = store.generate_report(None)?;
//! assert_eq!(report.summary().map(|c| c.total_requests), Some(1));
//! # Ok::<(), hardware_revive_core::AppResponse>(())
//! ```
//!
//! ## FFI Functions
//!
//! Every function returns a C string holding a serialized [`AppResponse`];
//! release it with [`free_response`].
//!
//! - [`create_store`] / [`create_store_with_config`] - Open a store
//! - [`load_document`] / [`save_document`] - Whole-document access
//! - [`create_user`], [`list_users`]
//! - [`create_request`], [`list_requests_by_user`], [`list_all_requests`]
//! - [`add_hardware`], [`list_hardwares_by_request`]
//! - [`generate_report`], [`list_reports`], [`get_report`]
//! - [`reset_db`] - Wipe all records
//! - [`close_store`] - Flush and release the store

pub mod app_response;
pub mod local_db_model;
pub mod local_db_state;
pub mod record_store;
pub mod storage;
pub mod store_config;

pub use crate::app_response::AppResponse;
pub use crate::local_db_model::{
    next_id, Document, HardwareCondition, HardwareItem, Identified, LooseId, Report, ReportContent,
    Request, RequestSummary, User,
};
pub use crate::local_db_state::AppDbState;
pub use crate::record_store::{parse_document_or_default, RecordStore};
pub use crate::storage::{DocumentStorage, MemoryStorage};
pub use crate::store_config::StoreConfig;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use log::{info, warn};
use serde::Serialize;

/// Store handle exported across FFI.
pub type LocalRecordStore = RecordStore<AppDbState>;

/// Opens (or creates) a store at `path` with default settings.
///
/// Returns a null pointer if `path` is null, not UTF-8, or the LMDB
/// environment cannot be opened. The handle must be released with
/// [`close_store`].
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_store(path: *const c_char) -> *mut LocalRecordStore {
    if path.is_null() {
        warn!("Null path pointer passed to create_store");
        return std::ptr::null_mut();
    }

    let path_str = match unsafe { CStr::from_ptr(path).to_str() } {
        Ok(s) => s,
        Err(e) => {
            warn!("Invalid UTF-8 in path parameter: {e}");
            return std::ptr::null_mut();
        }
    };

    open_store(&StoreConfig::new(path_str))
}

/// Opens a store from a JSON [`StoreConfig`].
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_store_with_config(config_json: *const c_char) -> *mut LocalRecordStore {
    if config_json.is_null() {
        warn!("Null config pointer passed to create_store_with_config");
        return std::ptr::null_mut();
    }

    let raw = match unsafe { CStr::from_ptr(config_json).to_str() } {
        Ok(s) => s,
        Err(e) => {
            warn!("Invalid UTF-8 in config parameter: {e}");
            return std::ptr::null_mut();
        }
    };

    match StoreConfig::from_json(raw) {
        Ok(config) => open_store(&config),
        Err(e) => {
            warn!("Rejected store config: {e}");
            std::ptr::null_mut()
        }
    }
}

fn open_store(config: &StoreConfig) -> *mut LocalRecordStore {
    info!("Attempting to open record store at: {}", config.path.display());

    match AppDbState::init(config) {
        Ok(state) => {
            info!("✅ Record store initialized successfully at {}", state.path().display());
            let store = RecordStore::with_key(state, config.storage_key.clone());
            Box::into_raw(Box::new(store))
        }
        Err(e) => {
            warn!("❌ Failed to initialize record store: {e}");
            warn!("Attempted path: {}", config.path.display());
            std::ptr::null_mut()
        }
    }
}

/// Returns the whole document, reinitializing it if absent or not JSON.
/// A JSON document whose records cannot be read yields `SerializationError`
/// and is left untouched.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn load_document(store: *mut LocalRecordStore) -> *const c_char {
    let store = match store_ref(store, "load_document") {
        Ok(s) => s,
        Err(err) => return err,
    };
    respond(store.load())
}

/// Replaces the persisted document with the given JSON document.
///
/// Report payloads are free-form and unknown condition tags or odd reference
/// ids are kept as given; only JSON that cannot be read as the four
/// collections is refused, leaving the stored document unchanged.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn save_document(store: *mut LocalRecordStore, json_ptr: *const c_char) -> *const c_char {
    let store = match store_ref(store, "save_document") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let json_str = match c_ptr_to_string(json_ptr, "JSON") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let doc: Document = match serde_json::from_str(&json_str) {
        Ok(d) => d,
        Err(e) => {
            let error = AppResponse::SerializationError(format!("Invalid document JSON: {e}"));
            return response_to_c_string(&error);
        }
    };

    match store.save(&doc) {
        Ok(()) => response_to_c_string(&AppResponse::success("Document saved")),
        Err(e) => response_to_c_string(&e),
    }
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_user(
    store: *mut LocalRecordStore,
    name: *const c_char,
    email: *const c_char,
) -> *const c_char {
    let store = match store_ref(store, "create_user") {
        Ok(s) => s,
        Err(err) => return err,
    };
    let name = match c_ptr_to_string(name, "name") {
        Ok(s) => s,
        Err(err) => return err,
    };
    let email = match c_ptr_to_string(email, "email") {
        Ok(s) => s,
        Err(err) => return err,
    };

    respond(store.create_user(&name, &email))
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn list_users(store: *mut LocalRecordStore) -> *const c_char {
    let store = match store_ref(store, "list_users") {
        Ok(s) => s,
        Err(err) => return err,
    };
    respond(store.list_users())
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_request(
    store: *mut LocalRecordStore,
    user_id: i64,
    address: *const c_char,
) -> *const c_char {
    let store = match store_ref(store, "create_request") {
        Ok(s) => s,
        Err(err) => return err,
    };
    let address = match c_ptr_to_string(address, "address") {
        Ok(s) => s,
        Err(err) => return err,
    };

    respond(store.create_request(user_id, &address))
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn list_requests_by_user(store: *mut LocalRecordStore, user_id: i64) -> *const c_char {
    let store = match store_ref(store, "list_requests_by_user") {
        Ok(s) => s,
        Err(err) => return err,
    };
    respond(store.list_requests_by_user(user_id))
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn list_all_requests(store: *mut LocalRecordStore) -> *const c_char {
    let store = match store_ref(store, "list_all_requests") {
        Ok(s) => s,
        Err(err) => return err,
    };
    respond(store.list_all_requests())
}

/// Adds a hardware item to a request.
///
/// `brand`, `model` and `condition` may be null. A null condition means
/// `non_functional`; an unrecognized one is a `ValidationError`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn add_hardware(
    store: *mut LocalRecordStore,
    request_id: i64,
    kind: *const c_char,
    brand: *const c_char,
    model: *const c_char,
    condition: *const c_char,
) -> *const c_char {
    let store = match store_ref(store, "add_hardware") {
        Ok(s) => s,
        Err(err) => return err,
    };
    let kind = match c_ptr_to_string(kind, "type") {
        Ok(s) => s,
        Err(err) => return err,
    };
    let brand = match optional_c_ptr_to_string(brand, "brand") {
        Ok(s) => s,
        Err(err) => return err,
    };
    let model = match optional_c_ptr_to_string(model, "model") {
        Ok(s) => s,
        Err(err) => return err,
    };
    let condition = match optional_c_ptr_to_string(condition, "condition") {
        Ok(None) => None,
        Ok(Some(raw)) => match raw.parse::<HardwareCondition>() {
            Ok(c) => Some(c),
            Err(e) => return response_to_c_string(&e),
        },
        Err(err) => return err,
    };

    respond(store.add_hardware(request_id, &kind, brand.as_deref(), model.as_deref(), condition))
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn list_hardwares_by_request(store: *mut LocalRecordStore, request_id: i64) -> *const c_char {
    let store = match store_ref(store, "list_hardwares_by_request") {
        Ok(s) => s,
        Err(err) => return err,
    };
    respond(store.list_hardwares_by_request(request_id))
}

/// Generates an ad-hoc report. `generated_by` may be null.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn generate_report(store: *mut LocalRecordStore, generated_by: *const c_char) -> *const c_char {
    let store = match store_ref(store, "generate_report") {
        Ok(s) => s,
        Err(err) => return err,
    };
    let generated_by = match optional_c_ptr_to_string(generated_by, "generated_by") {
        Ok(s) => s.map(|raw| LooseId::parse(&raw)),
        Err(err) => return err,
    };

    respond(store.generate_report(generated_by))
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn list_reports(store: *mut LocalRecordStore) -> *const c_char {
    let store = match store_ref(store, "list_reports") {
        Ok(s) => s,
        Err(err) => return err,
    };
    respond(store.list_reports())
}

/// Looks up a report; an unknown id yields `NotFound`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_report(store: *mut LocalRecordStore, id: i64) -> *const c_char {
    let store = match store_ref(store, "get_report") {
        Ok(s) => s,
        Err(err) => return err,
    };

    match store.get_report(id) {
        Ok(Some(report)) => respond(Ok(report)),
        Ok(None) => response_to_c_string(&AppResponse::NotFound(format!("No report found with id: {id}"))),
        Err(e) => response_to_c_string(&e),
    }
}

/// Wipes every collection. Hosts are expected to confirm with the user first.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn reset_db(store: *mut LocalRecordStore) -> *const c_char {
    let store = match store_ref(store, "reset_db") {
        Ok(s) => s,
        Err(err) => return err,
    };

    match store.reset_db() {
        Ok(()) => response_to_c_string(&AppResponse::success("All records were reset")),
        Err(e) => response_to_c_string(&e),
    }
}

/// Flushes the store and frees the handle. The pointer must not be used
/// afterwards.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn close_store(store: *mut LocalRecordStore) -> *const c_char {
    if store.is_null() {
        let error = AppResponse::BadRequest("Null store pointer passed to close_store".to_string());
        return response_to_c_string(&error);
    }

    let store = unsafe { Box::from_raw(store) };
    match store.into_storage().close_database() {
        Ok(()) => response_to_c_string(&AppResponse::success("Record store closed successfully")),
        Err(e) => response_to_c_string(&e),
    }
}

/// Releases a string returned by any function in this crate.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_response(ptr: *const c_char) {
    if ptr.is_null() {
        return;
    }
    unsafe {
        drop(CString::from_raw(ptr as *mut c_char));
    }
}

fn store_ref<'a>(store: *mut LocalRecordStore, caller: &str) -> Result<&'a LocalRecordStore, *const c_char> {
    match unsafe { store.as_ref() } {
        Some(s) => Ok(s),
        None => {
            let error = AppResponse::BadRequest(format!("Null store pointer passed to {caller}"));
            Err(response_to_c_string(&error))
        }
    }
}

/// Serializes a successful value into `AppResponse::Ok`, or passes the
/// error through.
fn respond<T: Serialize>(result: Result<T, AppResponse>) -> *const c_char {
    match result {
        Ok(value) => match serde_json::to_string(&value) {
            Ok(json) => response_to_c_string(&AppResponse::Ok(json)),
            Err(e) => {
                let error = AppResponse::SerializationError(format!("Failed to serialize result: {e}"));
                response_to_c_string(&error)
            }
        },
        Err(e) => response_to_c_string(&e),
    }
}

/// Converts an [`AppResponse`] to a heap C string, or null if it cannot be
/// represented.
fn response_to_c_string(response: &AppResponse) -> *const c_char {
    let json = match serde_json::to_string(response) {
        Ok(j) => j,
        Err(e) => {
            warn!("Error serializing response: {e}");
            return std::ptr::null();
        }
    };

    match CString::new(json) {
        Ok(c_str) => c_str.into_raw(),
        Err(e) => {
            warn!("Error creating CString: {e}");
            std::ptr::null()
        }
    }
}

fn c_ptr_to_string(ptr: *const c_char, field_name: &str) -> Result<String, *const c_char> {
    if ptr.is_null() {
        let error = AppResponse::BadRequest(format!("Null {field_name} pointer"));
        return Err(response_to_c_string(&error));
    }

    match unsafe { CStr::from_ptr(ptr).to_str() } {
        Ok(s) => Ok(s.to_string()),
        Err(e) => {
            let error = AppResponse::BadRequest(format!("Invalid UTF-8 in {field_name}: {e}"));
            Err(response_to_c_string(&error))
        }
    }
}

fn optional_c_ptr_to_string(ptr: *const c_char, field_name: &str) -> Result<Option<String>, *const c_char> {
    if ptr.is_null() {
        return Ok(None);
    }
    c_ptr_to_string(ptr, field_name).map(Some)
}
