use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::resources::{Bundle, Observation, PatientResource, LOINC_SYSTEM};
use super::SyncError;

/// Remote clinical record service. Blocking; call from a worker thread.
pub trait RecordService: Send + Sync {
    /// Demographic lookup by patient id. `Ok(None)` when the server has no match.
    fn find_patient(&self, patient_id: &str) -> Result<Option<PatientResource>, SyncError>;

    /// Most recent observation for a subject and LOINC code.
    fn latest_observation(
        &self,
        patient_id: &str,
        loinc_code: &str,
    ) -> Result<Option<Observation>, SyncError>;

    /// Create or replace a Patient resource under its id.
    fn put_patient(&self, patient: &PatientResource) -> Result<(), SyncError>;

    /// Create or replace an Observation resource under its id.
    fn put_observation(&self, observation: &Observation) -> Result<(), SyncError>;
}

/// FHIR R4 REST client over blocking HTTP.
pub struct FhirHttpClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl FhirHttpClient {
    /// Create a client for `base_url` with a bounded per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SyncError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs: timeout.as_secs(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_error(&self, e: reqwest::Error) -> SyncError {
        if e.is_connect() {
            SyncError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            SyncError::Timeout(self.timeout_secs)
        } else {
            SyncError::HttpClient(e.to_string())
        }
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, SyncError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SyncError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .map_err(|e| SyncError::Malformed(e.to_string()))
    }

    fn put_json<T: Serialize>(&self, path: &str, body: &T) -> Result<(), SyncError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .put(&url)
            .json(body)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SyncError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

fn require_id<'a>(id: &'a Option<String>, kind: &str) -> Result<&'a str, SyncError> {
    id.as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| SyncError::Malformed(format!("{kind} resource has no id")))
}

impl RecordService for FhirHttpClient {
    fn find_patient(&self, patient_id: &str) -> Result<Option<PatientResource>, SyncError> {
        let bundle: Bundle<PatientResource> = self.get_json("Patient", &[("_id", patient_id)])?;
        Ok(bundle.into_first())
    }

    fn latest_observation(
        &self,
        patient_id: &str,
        loinc_code: &str,
    ) -> Result<Option<Observation>, SyncError> {
        let subject = format!("Patient/{patient_id}");
        let code = format!("{LOINC_SYSTEM}|{loinc_code}");
        let bundle: Bundle<Observation> = self.get_json(
            "Observation",
            &[
                ("_sort", "-date"),
                ("_count", "1"),
                ("subject", &subject),
                ("code", &code),
            ],
        )?;
        Ok(bundle.into_first())
    }

    fn put_patient(&self, patient: &PatientResource) -> Result<(), SyncError> {
        let id = require_id(&patient.id, "Patient")?;
        self.put_json(&format!("Patient/{id}"), patient)
    }

    fn put_observation(&self, observation: &Observation) -> Result<(), SyncError> {
        let id = require_id(&observation.id, "Observation")?;
        self.put_json(&format!("Observation/{id}"), observation)
    }
}

/// In-memory record service for tests.
///
/// Observations are kept per (subject, code) in insertion order; the
/// latest one wins, as with `_sort=-date` on a real server.
#[derive(Default)]
pub struct MockRecordService {
    patients: Mutex<HashMap<String, PatientResource>>,
    observations: Mutex<HashMap<(String, String), Vec<Observation>>>,
    failing_codes: Vec<String>,
    offline: bool,
    calls: Mutex<usize>,
}

impl MockRecordService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with a connection error.
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    /// Observation lookups for `code` fail with a server error.
    pub fn with_failing_code(mut self, code: &str) -> Self {
        self.failing_codes.push(code.to_string());
        self
    }

    /// Number of remote calls made so far.
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn patient(&self, id: &str) -> Option<PatientResource> {
        self.patients
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    pub fn observations_for(&self, patient_id: &str) -> Vec<Observation> {
        let subject = format!("Patient/{patient_id}");
        self.observations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|((s, _), _)| *s == subject)
            .flat_map(|(_, obs)| obs.iter().cloned())
            .collect()
    }

    fn enter(&self) -> Result<(), SyncError> {
        *self.calls.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        if self.offline {
            return Err(SyncError::Connection("mock://offline".into()));
        }
        Ok(())
    }
}

fn observation_key(obs: &Observation) -> Option<(String, String)> {
    let subject = obs.subject.as_ref()?.reference.clone()?;
    let code = obs.code.as_ref()?.coding.first()?.code.clone()?;
    Some((subject, code))
}

impl RecordService for MockRecordService {
    fn find_patient(&self, patient_id: &str) -> Result<Option<PatientResource>, SyncError> {
        self.enter()?;
        Ok(self.patient(patient_id))
    }

    fn latest_observation(
        &self,
        patient_id: &str,
        loinc_code: &str,
    ) -> Result<Option<Observation>, SyncError> {
        self.enter()?;
        if self.failing_codes.iter().any(|c| c == loinc_code) {
            return Err(SyncError::Status {
                status: 500,
                body: format!("lookup for {loinc_code} failed"),
            });
        }
        let key = (format!("Patient/{patient_id}"), loinc_code.to_string());
        Ok(self
            .observations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
            .and_then(|obs| obs.last().cloned()))
    }

    fn put_patient(&self, patient: &PatientResource) -> Result<(), SyncError> {
        self.enter()?;
        let id = require_id(&patient.id, "Patient")?.to_string();
        self.patients
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, patient.clone());
        Ok(())
    }

    fn put_observation(&self, observation: &Observation) -> Result<(), SyncError> {
        self.enter()?;
        require_id(&observation.id, "Observation")?;
        if let Some(code) = observation
            .code
            .as_ref()
            .and_then(|c| c.coding.first())
            .and_then(|c| c.code.as_deref())
        {
            if self.failing_codes.iter().any(|c| c == code) {
                return Err(SyncError::Status {
                    status: 500,
                    body: format!("upload for {code} failed"),
                });
            }
        }
        let key = observation_key(observation)
            .ok_or_else(|| SyncError::Malformed("observation lacks subject or code".into()))?;
        self.observations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(key)
            .or_default()
            .push(observation.clone());
        Ok(())
    }
}
