//! FreeIPA JSON-RPC client

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, REFERER};
use reqwest::StatusCode;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use super::rpc::{self, BatchCall, Request, Response, NOT_FOUND};
use crate::config::Settings;
use crate::directory::{
    Directory, DirectoryError, DirectoryResult, Lookup, MemberAdd, MembershipSet, NewStudent,
    StudentRecord,
};
use crate::ident::{ClassName, StudentId};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Session with a FreeIPA server
///
/// Log in once with [`IpaClient::login`]; the session cookie is kept by the
/// HTTP client for every later call.
#[derive(Debug)]
pub struct IpaClient {
    http: Client,
    base_url: String,
    api_version: String,
}

impl IpaClient {
    /// Create a client for `base_url` (e.g. `https://ipa.example.com`).
    ///
    /// # Errors
    /// Returns an error if the CA bundle can't be loaded or the HTTP client
    /// can't be built
    pub fn new(
        base_url: &str,
        api_version: &str,
        ca_cert: Option<&Path>,
    ) -> DirectoryResult<Self> {
        let mut builder = Client::builder()
            .cookie_store(true)
            .timeout(REQUEST_TIMEOUT);

        if let Some(path) = ca_cert {
            let pem = fs::read(path).map_err(|e| {
                DirectoryError::Unavailable(format!("cannot read {}: {e}", path.display()))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                DirectoryError::Unavailable(format!("invalid CA bundle {}: {e}", path.display()))
            })?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder
            .build()
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: api_version.to_string(),
        })
    }

    /// Build a client from settings and log in as the configured user.
    ///
    /// # Errors
    /// Returns an error if the server is unreachable or rejects the login
    pub fn connect(settings: &Settings, base_url: &str, password: &str) -> DirectoryResult<Self> {
        let ca_cert = settings.ca_cert_path();
        let client = Self::new(base_url, &settings.api_version, ca_cert.as_deref())?;
        client.login(&settings.user, password)?;
        Ok(client)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Password login; stores the session cookie.
    ///
    /// # Errors
    /// Returns `Unavailable` if the server can't be reached or refuses the
    /// credentials
    pub fn login(&self, user: &str, password: &str) -> DirectoryResult<()> {
        let response = self
            .http
            .post(format!("{}/ipa/session/login_password", self.base_url))
            .header(REFERER, self.referer())
            .header(ACCEPT, "text/plain")
            .form(&[("user", user), ("password", password)])
            .send()
            .map_err(unreachable_server)?;

        match response.status() {
            status if status.is_success() => {
                tracing::info!(user, server = %self.base_url, "logged in");
                Ok(())
            }
            StatusCode::UNAUTHORIZED => Err(DirectoryError::Unavailable(format!(
                "login rejected for user '{user}'"
            ))),
            status => Err(DirectoryError::Unavailable(format!(
                "login failed with HTTP {status}"
            ))),
        }
    }

    /// Run one command and return its `result`.
    ///
    /// # Errors
    /// Returns `Rejected` if the command fails, `Unavailable` on transport or
    /// session failure
    pub fn call(
        &self,
        method: &str,
        args: Vec<Value>,
        mut options: Map<String, Value>,
    ) -> DirectoryResult<Value> {
        options.insert("version".to_string(), json!(self.api_version));
        let request = Request {
            method,
            params: (args, options),
            id: 0,
        };

        let started = Instant::now();
        let response = self
            .http
            .post(format!("{}/ipa/session/json", self.base_url))
            .header(REFERER, self.referer())
            .header(ACCEPT, "application/json")
            .json(&request)
            .send()
            .map_err(unreachable_server)?;
        tracing::debug!(method, elapsed = ?started.elapsed(), "rpc round trip");

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED => {
                return Err(DirectoryError::Unavailable(
                    "session rejected (HTTP 401)".to_string(),
                ))
            }
            status => {
                return Err(DirectoryError::Protocol(format!(
                    "{method} returned HTTP {status}"
                )))
            }
        }

        let body: Response = response
            .json()
            .map_err(|e| DirectoryError::Protocol(format!("{method}: {e}")))?;
        if let Some(error) = body.error {
            return Err(error.into());
        }
        body.result
            .ok_or_else(|| DirectoryError::Protocol(format!("{method}: missing result")))
    }

    /// Run several commands in one `batch` round trip.
    ///
    /// # Errors
    /// Fails only if the batch as a whole fails; per-command errors are in
    /// the returned entries
    pub fn batch(&self, calls: Vec<BatchCall>) -> DirectoryResult<Vec<Value>> {
        let expected = calls.len();
        // Each command is one positional argument of `batch`
        let args = calls
            .into_iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DirectoryError::Protocol(e.to_string()))?;
        let result = self.call("batch", args, Map::new())?;
        rpc::batch_results(result, expected)
    }

    fn referer(&self) -> String {
        format!("{}/ipa", self.base_url)
    }

    fn show(&self, method: &str, name: &str) -> DirectoryResult<Option<Value>> {
        match self.call(method, vec![json!(name)], Map::new()) {
            Ok(result) => Ok(Some(result)),
            Err(DirectoryError::Rejected { code, .. }) if code == NOT_FOUND => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn unreachable_server(err: reqwest::Error) -> DirectoryError {
    DirectoryError::Unavailable(err.to_string())
}

fn options(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

impl Directory for IpaClient {
    fn find_groups(&self, criteria: Option<&str>) -> DirectoryResult<Vec<String>> {
        let result = self.call(
            "group_find",
            vec![json!(criteria.unwrap_or_default())],
            options(&[("sizelimit", json!(0)), ("pkey_only", json!(true))]),
        )?;
        let Some(Value::Array(entries)) = result.get("result") else {
            return Err(DirectoryError::Protocol("group_find: expected a list".into()));
        };
        Ok(entries
            .iter()
            .filter_map(|entry| rpc::first_str(entry, "cn"))
            .map(str::to_string)
            .collect())
    }

    fn group_members(&self, class: &ClassName) -> DirectoryResult<Option<MembershipSet>> {
        let Some(result) = self.show("group_show", class.as_str())? else {
            return Ok(None);
        };
        let entry = result.get("result").unwrap_or(&result);
        Ok(Some(MembershipSet {
            direct: rpc::all_str(entry, "member_user").into_iter().collect(),
            indirect: rpc::all_str(entry, "memberindirect_user")
                .into_iter()
                .collect(),
        }))
    }

    fn group_exists(&self, class: &ClassName) -> DirectoryResult<bool> {
        Ok(self.show("group_show", class.as_str())?.is_some())
    }

    fn create_group(&self, class: &ClassName, description: &str) -> DirectoryResult<()> {
        self.call(
            "group_add",
            vec![json!(class.as_str())],
            options(&[("description", json!(description))]),
        )?;
        Ok(())
    }

    fn user_exists(&self, uid: &StudentId) -> DirectoryResult<bool> {
        Ok(self.show("user_show", uid.as_str())?.is_some())
    }

    fn create_user(&self, student: &NewStudent) -> DirectoryResult<()> {
        self.call(
            "user_add",
            vec![json!(student.uid.as_str())],
            options(&[
                ("givenname", json!(student.given_name)),
                ("sn", json!(student.surname)),
                ("cn", json!(student.full_name())),
                ("userpassword", json!(student.initial_password)),
            ]),
        )?;
        Ok(())
    }

    fn check_users(&self, uids: &[StudentId]) -> DirectoryResult<Vec<Lookup>> {
        let calls = uids
            .iter()
            .map(|uid| BatchCall::new("user_show", vec![json!(uid.as_str())], Map::new()))
            .collect();
        Ok(self
            .batch(calls)?
            .iter()
            .map(rpc::lookup_outcome)
            .collect())
    }

    fn add_members(
        &self,
        class: &ClassName,
        uids: &[StudentId],
    ) -> DirectoryResult<Vec<MemberAdd>> {
        let calls = uids
            .iter()
            .map(|uid| {
                BatchCall::new(
                    "group_add_member",
                    vec![json!(class.as_str())],
                    options(&[("user", json!([uid.as_str()]))]),
                )
            })
            .collect();
        Ok(self
            .batch(calls)?
            .iter()
            .map(rpc::member_add_outcome)
            .collect())
    }

    fn find_users(&self, criteria: Option<&str>) -> DirectoryResult<Vec<StudentRecord>> {
        let result = self.call(
            "user_find",
            vec![json!(criteria.unwrap_or_default())],
            options(&[("all", json!(true)), ("sizelimit", json!(0))]),
        )?;
        let Some(Value::Array(entries)) = result.get("result") else {
            return Err(DirectoryError::Protocol("user_find: expected a list".into()));
        };
        Ok(entries.iter().filter_map(rpc::student_record).collect())
    }
}
