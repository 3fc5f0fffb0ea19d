use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;

use crate::address::StreetAddress;
use crate::error::FetchError;

/// Contract values of the external polling-place form.
///
/// The hidden-field ids, the form field names, and the result element id are
/// stable identifiers published by the form itself; they are configuration,
/// not computed values. Defaults match the Orange County FL lookup form.
#[derive(Debug, Clone)]
pub struct LookupConfig {
    /// Page that both serves the form and receives the POST.
    pub form_url: String,
    /// Hidden anti-forgery/view-state fields captured fresh from every GET.
    pub auth_fields: Vec<String>,
    /// Element id whose text is the resolved center name.
    pub result_id: String,
    pub field_number: String,
    pub field_directional: String,
    pub field_street: String,
    pub field_zip: String,
    pub submit_field: String,
    pub submit_label: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            form_url: "http://www.ocfelections.com/voter_lookup/FindPollingPlace.aspx".into(),
            auth_fields: vec![
                "__VIEWSTATE".into(),
                "__VIEWSTATEGENERATOR".into(),
                "__EVENTVALIDATION".into(),
            ],
            result_id: "cntyPllLbl".into(),
            field_number: "STRT_NMBR".into(),
            field_directional: "drctnDDL".into(),
            field_street: "StrNmeTb".into(),
            field_zip: "ZP_CDE".into(),
            submit_field: "submitBtn".into(),
            submit_label: "Find Your Polling Place".into(),
        }
    }
}

/// Transport seam for the form session, kept narrow so tests can record
/// request bodies without a network.
pub trait FormTransport {
    fn get(&mut self, url: &str) -> Result<String, FetchError>;
    fn post_form(&mut self, url: &str, fields: &[(String, String)]) -> Result<String, FetchError>;
}

impl<T: FormTransport + ?Sized> FormTransport for &mut T {
    fn get(&mut self, url: &str) -> Result<String, FetchError> {
        (**self).get(url)
    }
    fn post_form(&mut self, url: &str, fields: &[(String, String)]) -> Result<String, FetchError> {
        (**self).post_form(url, fields)
    }
}

/// Blocking reqwest transport with a cookie jar. The form is a stateful
/// ASP.NET session, so the POST must carry the cookies issued by the GET.
pub struct HttpForm {
    client: Client,
}

impl HttpForm {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!("pollmap/", env!("CARGO_PKG_VERSION")))
            .cookie_store(true)
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client })
    }
}

impl FormTransport for HttpForm {
    fn get(&mut self, url: &str) -> Result<String, FetchError> {
        let resp = self.client.get(url).send()?.error_for_status()?;
        Ok(resp.text()?)
    }

    fn post_form(&mut self, url: &str, fields: &[(String, String)]) -> Result<String, FetchError> {
        let resp = self
            .client
            .post(url)
            .form(fields)
            .send()?
            .error_for_status()?;
        Ok(resp.text()?)
    }
}

/// Address to voting-center name via the stateful lookup form.
pub trait CenterLookup {
    fn lookup(&mut self, address: &StreetAddress) -> Result<Option<String>, FetchError>;
}

impl<T: CenterLookup + ?Sized> CenterLookup for &mut T {
    fn lookup(&mut self, address: &StreetAddress) -> Result<Option<String>, FetchError> {
        (**self).lookup(address)
    }
}

/// Scraping client for the polling-place form.
///
/// Each lookup GETs the form page, captures its single-use hidden auth
/// tokens, and POSTs them back together with the address fields. Tokens are
/// time-sensitive and never cached across lookups.
pub struct CenterLookupClient<T: FormTransport> {
    transport: T,
    config: LookupConfig,
}

impl CenterLookupClient<HttpForm> {
    pub fn new(config: LookupConfig) -> Result<Self, FetchError> {
        Ok(Self::with_transport(HttpForm::new()?, config))
    }
}

impl<T: FormTransport> CenterLookupClient<T> {
    pub fn with_transport(transport: T, config: LookupConfig) -> Self {
        Self { transport, config }
    }

    /// Fetch the form and capture its hidden auth tokens. A page missing any
    /// of them is a transient failure (the form occasionally serves an
    /// interstitial), not a miss.
    fn fetch_auth(&mut self) -> Result<Vec<(String, String)>, FetchError> {
        let page = self.transport.get(&self.config.form_url)?;
        self.config
            .auth_fields
            .iter()
            .map(|id| {
                hidden_value(&page, id)
                    .map(|value| (id.clone(), value))
                    .ok_or_else(|| {
                        FetchError::Transient(format!("form page missing hidden field {id}"))
                    })
            })
            .collect()
    }
}

impl<T: FormTransport> CenterLookup for CenterLookupClient<T> {
    fn lookup(&mut self, address: &StreetAddress) -> Result<Option<String>, FetchError> {
        let mut fields = vec![
            (self.config.field_number.clone(), address.number.clone()),
            (
                self.config.field_directional.clone(),
                address.directional.clone().unwrap_or_default(),
            ),
            (self.config.field_street.clone(), address.street.clone()),
            (self.config.field_zip.clone(), address.zip.clone()),
            (
                self.config.submit_field.clone(),
                self.config.submit_label.clone(),
            ),
        ];
        fields.extend(self.fetch_auth()?);

        let page = self.transport.post_form(&self.config.form_url, &fields)?;
        Ok(element_text(&page, &self.config.result_id).filter(|text| !text.is_empty()))
    }
}

/// Value of the `<input>` with the given id, tolerating either attribute order.
fn hidden_value(html: &str, id: &str) -> Option<String> {
    let id = regex::escape(id);
    let id_first = Regex::new(&format!(
        r#"<input\b[^>]*\bid="{id}"[^>]*\bvalue="([^"]*)""#
    ))
    .ok()?;
    if let Some(caps) = id_first.captures(html) {
        return Some(caps[1].to_owned());
    }
    let value_first = Regex::new(&format!(
        r#"<input\b[^>]*\bvalue="([^"]*)"[^>]*\bid="{id}""#
    ))
    .ok()?;
    value_first.captures(html).map(|caps| caps[1].to_owned())
}

/// Text content of the first element with the given id.
fn element_text(html: &str, id: &str) -> Option<String> {
    let re = Regex::new(&format!(
        r#"<[A-Za-z][^>]*\bid="{}"[^>]*>([^<]*)<"#,
        regex::escape(id)
    ))
    .ok()?;
    re.captures(html).map(|caps| caps[1].trim().to_owned())
}
