//! Contacts (rental inquiries) client.
//!
//! All calls go through `SessionManager::api_request`, so they carry the
//! bearer token and share the refresh-and-retry policy. The listing endpoint
//! returns every matching contact; pagination happens client-side.

use chrono::{DateTime, Days, NaiveDate, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::ClientError;
use crate::gateway::{GatewayResponse, RequestOptions};
use crate::session::SessionManager;
use crate::store::{AnyStore, TokenStore};

pub const CONTACTS_PATH: &str = "/api/v1/contacts";

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_LIMIT: u32 = 10;

/// Days ahead the dashboard looks for upcoming parties.
pub const UPCOMING_DAYS: u32 = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmationStatus {
    Confirmed,
    #[default]
    Pending,
    #[serde(rename = "Called / Texted")]
    CalledTexted,
    Declined,
    Cancelled,
}

impl ConfirmationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmationStatus::Confirmed => "Confirmed",
            ConfirmationStatus::Pending => "Pending",
            ConfirmationStatus::CalledTexted => "Called / Texted",
            ConfirmationStatus::Declined => "Declined",
            ConfirmationStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for ConfirmationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfirmationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "confirmed" => Ok(ConfirmationStatus::Confirmed),
            "pending" => Ok(ConfirmationStatus::Pending),
            "called / texted" | "called" | "texted" | "called-texted" => {
                Ok(ConfirmationStatus::CalledTexted)
            }
            "declined" => Ok(ConfirmationStatus::Declined),
            "cancelled" | "canceled" => Ok(ConfirmationStatus::Cancelled),
            other => Err(format!("unknown confirmation status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Quickbooks,
    Paypal,
    Free,
}

/// A rental inquiry as returned by the API. Dates are ISO-8601 strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(rename = "_id")]
    pub id: String,
    pub bouncer: String,
    pub email: String,
    pub phone: Option<String>,
    pub party_date: String,
    pub party_zip_code: String,
    pub message: Option<String>,
    #[serde(default)]
    pub confirmed: ConfirmationStatus,
    pub tables_chairs: Option<bool>,
    pub generator: Option<bool>,
    pub popcorn_machine: Option<bool>,
    pub cotton_candy_machine: Option<bool>,
    pub snow_cone_machine: Option<bool>,
    pub basketball_shoot: Option<bool>,
    pub slushy_machine: Option<bool>,
    pub overnight: Option<bool>,
    #[serde(default)]
    pub source_page: String,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub party_start_time: Option<String>,
    pub party_end_time: Option<String>,
    pub delivery_day: Option<String>,
    pub delivery_time: Option<String>,
    pub pickup_day: Option<String>,
    pub pickup_time: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub discount_comments: Option<String>,
    pub admin_comments: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Partial contact for PATCH updates. Unset fields are not sent.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bouncer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party_zip_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed: Option<ConfirmationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables_chairs: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popcorn_machine: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cotton_candy_machine: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snow_cone_machine: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basketball_shoot: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slushy_machine: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overnight: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party_start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party_end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_day: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_day: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_comments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_comments: Option<String>,
}

/// Listing filters and page selection.
#[derive(Debug, Clone, Default)]
pub struct ContactQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub delivery_day: Option<String>,
    pub confirmed: Option<String>,
}

impl ContactQuery {
    /// Query string including the leading `?`, or empty when nothing is set.
    /// Zero page/limit and empty strings are omitted.
    pub fn to_query_string(&self) -> String {
        let mut params: Vec<(&str, String)> = Vec::new();

        if let Some(page) = self.page.filter(|p| *p > 0) {
            params.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit.filter(|l| *l > 0) {
            params.push(("limit", limit.to_string()));
        }
        let filters = [
            ("startDate", &self.start_date),
            ("endDate", &self.end_date),
            ("deliveryDay", &self.delivery_day),
            ("confirmed", &self.confirmed),
        ];
        for (name, value) in filters {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                params.push((name, v.to_string()));
            }
        }

        if params.is_empty() {
            return String::new();
        }

        let joined = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("?{joined}")
    }
}

/// One page of results plus navigation metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total_count: usize,
    pub current_page: u32,
    pub total_pages: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

/// Slice `items` into the requested page. Zero or missing page/limit fall
/// back to page 1 and 10 per page.
pub fn paginate<T>(items: Vec<T>, page: Option<u32>, limit: Option<u32>) -> Page<T> {
    let page = page.filter(|p| *p > 0).unwrap_or(DEFAULT_PAGE);
    let limit = limit.filter(|l| *l > 0).unwrap_or(DEFAULT_LIMIT);

    let total_count = items.len();
    let total_pages = total_count.div_ceil(limit as usize) as u32;
    let start = ((page - 1) as usize).saturating_mul(limit as usize);

    let data = items
        .into_iter()
        .skip(start)
        .take(limit as usize)
        .collect();

    Page {
        data,
        total_count,
        current_page: page,
        total_pages,
        has_next_page: page < total_pages,
        has_prev_page: page > 1,
    }
}

/// Calendar day (UTC) of a contact's party. Accepts RFC 3339 timestamps and
/// bare `YYYY-MM-DD` dates.
pub fn party_day(contact: &Contact) -> Option<NaiveDate> {
    let raw = contact.party_date.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc).date_naive());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Contacts whose party falls on today or one of the next `days` days.
/// Contacts with an unparseable party date are skipped.
pub fn upcoming(contacts: &[Contact], now: DateTime<Utc>, days: u32) -> Vec<&Contact> {
    let today = now.date_naive();
    let last = today
        .checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX);

    contacts
        .iter()
        .filter(|c| match party_day(c) {
            Some(day) => day >= today && day <= last,
            None => {
                tracing::debug!(id = %c.id, party_date = %c.party_date, "Unparseable party date");
                false
            }
        })
        .collect()
}

pub fn count_by_status(contacts: &[Contact], status: ConfirmationStatus) -> usize {
    contacts.iter().filter(|c| c.confirmed == status).count()
}

/// Figures for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_contacts: usize,
    pub pending: usize,
    pub confirmed: usize,
    pub upcoming: Vec<Contact>,
}

impl DashboardSummary {
    /// The total counts every match of the listing; the other figures cover
    /// only the contacts on `page`.
    pub fn from_page(page: &Page<Contact>, now: DateTime<Utc>) -> Self {
        Self {
            total_contacts: page.total_count,
            pending: count_by_status(&page.data, ConfirmationStatus::Pending),
            confirmed: count_by_status(&page.data, ConfirmationStatus::Confirmed),
            upcoming: upcoming(&page.data, now, UPCOMING_DAYS)
                .into_iter()
                .cloned()
                .collect(),
        }
    }
}

/// Accept `{contacts: [...]}` or a bare array; anything else is empty.
fn contacts_from_value(value: Value) -> Result<Vec<Contact>, ClientError> {
    let list = match value {
        Value::Object(mut map) => map.remove("contacts").unwrap_or(Value::Array(Vec::new())),
        Value::Array(items) => Value::Array(items),
        _ => Value::Array(Vec::new()),
    };
    serde_json::from_value(list).map_err(|e| ClientError::Decode(e.to_string()))
}

/// Accept `{contact: {...}}` or the bare contact.
fn contact_from_value(value: Value) -> Result<Contact, ClientError> {
    let inner = match value {
        Value::Object(mut map) if map.contains_key("contact") => {
            map.remove("contact").unwrap_or(Value::Null)
        }
        other => other,
    };
    serde_json::from_value(inner).map_err(|e| ClientError::Decode(e.to_string()))
}

async fn ensure_ok(resp: GatewayResponse, what: &str) -> Result<Value, ClientError> {
    if !resp.ok() {
        return Err(ClientError::Api {
            status: resp.status().as_u16(),
            message: format!("Error {what}"),
        });
    }
    resp.json().await
}

/// Contacts API bound to one session.
pub struct ContactsClient<S: TokenStore = AnyStore> {
    session: Arc<SessionManager<S>>,
}

impl<S: TokenStore> ContactsClient<S> {
    pub fn new(session: Arc<SessionManager<S>>) -> Self {
        Self { session }
    }

    pub async fn fetch_contacts(&self, query: &ContactQuery) -> Result<Page<Contact>, ClientError> {
        let endpoint = format!("{}{}", CONTACTS_PATH, query.to_query_string());
        let resp = self
            .session
            .api_request(&endpoint, RequestOptions::new(Method::GET))
            .await?;

        let contacts = contacts_from_value(ensure_ok(resp, "fetching contacts").await?)?;
        Ok(paginate(contacts, query.page, query.limit))
    }

    /// Fetch one listing page and summarize it as of `now`.
    pub async fn dashboard(
        &self,
        query: &ContactQuery,
        now: DateTime<Utc>,
    ) -> Result<DashboardSummary, ClientError> {
        let page = self.fetch_contacts(query).await?;
        Ok(DashboardSummary::from_page(&page, now))
    }

    pub async fn get_contact(&self, id: &str) -> Result<Contact, ClientError> {
        let endpoint = contact_path(id);
        let resp = self
            .session
            .api_request(&endpoint, RequestOptions::new(Method::GET))
            .await?;

        contact_from_value(ensure_ok(resp, "fetching contact").await?)
    }

    pub async fn update_contact_status(
        &self,
        id: &str,
        status: ConfirmationStatus,
    ) -> Result<Contact, ClientError> {
        let update = ContactUpdate {
            confirmed: Some(status),
            ..ContactUpdate::default()
        };
        self.update_contact(id, &update).await
    }

    pub async fn update_contact(
        &self,
        id: &str,
        update: &ContactUpdate,
    ) -> Result<Contact, ClientError> {
        let endpoint = contact_path(id);
        let resp = self
            .session
            .api_request(&endpoint, RequestOptions::json(Method::PATCH, update)?)
            .await?;

        contact_from_value(ensure_ok(resp, "updating contact").await?)
    }
}

fn contact_path(id: &str) -> String {
    format!("{}/{}", CONTACTS_PATH, urlencoding::encode(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn contact_json(id: &str) -> Value {
        json!({
            "_id": id,
            "bouncer": "Castle",
            "email": "party@example.com",
            "partyDate": "2026-06-01T00:00:00.000Z",
            "partyZipCode": "78201",
            "confirmed": "Called / Texted",
            "sourcePage": "/rentals",
            "paymentMethod": "cash"
        })
    }

    #[test]
    fn test_query_string_empty() {
        assert_eq!(ContactQuery::default().to_query_string(), "");
    }

    #[test]
    fn test_query_string_order_and_encoding() {
        let query = ContactQuery {
            page: Some(2),
            limit: Some(5),
            start_date: Some("2026-01-01".into()),
            confirmed: Some("Called / Texted".into()),
            ..Default::default()
        };
        assert_eq!(
            query.to_query_string(),
            "?page=2&limit=5&startDate=2026-01-01&confirmed=Called%20%2F%20Texted"
        );
    }

    #[test]
    fn test_query_string_skips_zero_and_empty() {
        let query = ContactQuery {
            page: Some(0),
            delivery_day: Some(String::new()),
            end_date: Some("2026-02-01".into()),
            ..Default::default()
        };
        assert_eq!(query.to_query_string(), "?endDate=2026-02-01");
    }

    #[test]
    fn test_paginate_middle_page() {
        let page = paginate((1..=25).collect::<Vec<_>>(), Some(2), Some(10));
        assert_eq!(page.data, (11..=20).collect::<Vec<_>>());
        assert_eq!(page.total_count, 25);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next_page);
        assert!(page.has_prev_page);
    }

    #[test]
    fn test_paginate_defaults_and_last_page() {
        let page = paginate((1..=10).collect::<Vec<_>>(), None, None);
        assert_eq!(page.current_page, 1);
        assert_eq!(page.data.len(), 10);
        assert_eq!(page.total_pages, 1);
        assert!(!page.has_next_page);
        assert!(!page.has_prev_page);
    }

    #[test]
    fn test_paginate_past_end_is_empty() {
        let page = paginate(vec![1, 2, 3], Some(5), Some(2));
        assert!(page.data.is_empty());
        assert_eq!(page.total_pages, 2);
        assert!(!page.has_next_page);
    }

    #[test]
    fn test_paginate_empty_input() {
        let page: Page<u8> = paginate(Vec::new(), Some(1), Some(10));
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next_page);
    }

    #[test]
    fn test_contacts_from_wrapped_and_bare() {
        let wrapped = contacts_from_value(json!({"contacts": [contact_json("a")]})).unwrap();
        assert_eq!(wrapped[0].id, "a");

        let bare = contacts_from_value(json!([contact_json("b"), contact_json("c")])).unwrap();
        assert_eq!(bare.len(), 2);

        assert!(contacts_from_value(json!({"success": true})).unwrap().is_empty());
    }

    #[test]
    fn test_contact_from_wrapped_and_bare() {
        let wrapped = contact_from_value(json!({"contact": contact_json("a")})).unwrap();
        assert_eq!(wrapped.confirmed, ConfirmationStatus::CalledTexted);
        assert_eq!(wrapped.payment_method, Some(PaymentMethod::Cash));

        let bare = contact_from_value(contact_json("b")).unwrap();
        assert_eq!(bare.id, "b");
    }

    #[test]
    fn test_status_parse_and_display() {
        assert_eq!(
            "called / texted".parse::<ConfirmationStatus>().unwrap(),
            ConfirmationStatus::CalledTexted
        );
        assert_eq!(ConfirmationStatus::Cancelled.to_string(), "Cancelled");
        assert!("maybe".parse::<ConfirmationStatus>().is_err());
    }

    #[test]
    fn test_status_update_body() {
        let update = ContactUpdate {
            confirmed: Some(ConfirmationStatus::Confirmed),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"confirmed": "Confirmed"}));
    }

    #[test]
    fn test_update_body_sends_flags_and_times_in_camel_case() {
        let update = ContactUpdate {
            tables_chairs: Some(true),
            overnight: Some(false),
            party_start_time: Some("10:00".into()),
            source_page: Some("/rentals".into()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({
                "tablesChairs": true,
                "overnight": false,
                "partyStartTime": "10:00",
                "sourcePage": "/rentals"
            })
        );
    }

    fn contact_on(id: &str, party_date: &str, status: &str) -> Contact {
        let mut value = contact_json(id);
        value["partyDate"] = json!(party_date);
        value["confirmed"] = json!(status);
        serde_json::from_value(value).unwrap()
    }

    fn dashboard_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-06-01T15:30:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_party_day_formats() {
        let ts = contact_on("a", "2026-06-08T00:00:00.000Z", "Pending");
        assert_eq!(party_day(&ts), NaiveDate::from_ymd_opt(2026, 6, 8));

        let bare = contact_on("b", "2026-06-08", "Pending");
        assert_eq!(party_day(&bare), NaiveDate::from_ymd_opt(2026, 6, 8));

        assert!(party_day(&contact_on("c", "next tuesday", "Pending")).is_none());
    }

    #[test]
    fn test_upcoming_window_is_inclusive() {
        let contacts = vec![
            contact_on("yesterday", "2026-05-31T00:00:00.000Z", "Pending"),
            // Earlier in the day than `now` but still today
            contact_on("today", "2026-06-01T00:00:00.000Z", "Pending"),
            contact_on("day7", "2026-06-08", "Confirmed"),
            contact_on("day8", "2026-06-09T00:00:00.000Z", "Pending"),
            contact_on("garbage", "soon", "Pending"),
        ];

        let ids: Vec<_> = upcoming(&contacts, dashboard_now(), UPCOMING_DAYS)
            .into_iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(ids, vec!["today", "day7"]);
    }

    #[test]
    fn test_upcoming_zero_days_is_today_only() {
        let contacts = vec![
            contact_on("today", "2026-06-01", "Pending"),
            contact_on("tomorrow", "2026-06-02", "Pending"),
        ];
        let found = upcoming(&contacts, dashboard_now(), 0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "today");
    }

    #[test]
    fn test_count_by_status() {
        let contacts = vec![
            contact_on("a", "2026-06-01", "Pending"),
            contact_on("b", "2026-06-01", "Confirmed"),
            contact_on("c", "2026-06-01", "Pending"),
            contact_on("d", "2026-06-01", "Called / Texted"),
        ];
        assert_eq!(count_by_status(&contacts, ConfirmationStatus::Pending), 2);
        assert_eq!(count_by_status(&contacts, ConfirmationStatus::Confirmed), 1);
        assert_eq!(count_by_status(&contacts, ConfirmationStatus::Declined), 0);
    }

    #[test]
    fn test_dashboard_summary_from_page() {
        let contacts = vec![
            contact_on("a", "2026-06-03", "Pending"),
            contact_on("b", "2026-07-01", "Confirmed"),
            contact_on("c", "2026-05-01", "Declined"),
        ];
        let mut page = paginate(contacts, Some(1), Some(10));
        page.total_count = 42;

        let summary = DashboardSummary::from_page(&page, dashboard_now());
        assert_eq!(summary.total_contacts, 42);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.confirmed, 1);
        assert_eq!(summary.upcoming.len(), 1);
        assert_eq!(summary.upcoming[0].id, "a");
    }

    #[test]
    fn test_contact_path_encodes_id() {
        assert_eq!(contact_path("abc 1"), "/api/v1/contacts/abc%201");
    }
}
