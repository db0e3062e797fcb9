use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

use super::{
    CallLogEntry, CompanyInfoRecord, DepartmentRecord, DirectoryClient, DirectoryError,
    DirectoryResult, EmployeeRecord, MessageStatusUpdate, NewMessage,
};
use crate::utils::{error_body, http_client};

const EMPLOYEE_SELECT: &str = "*,departments(name)";

#[derive(Debug, Deserialize)]
struct DepartmentName {
    name: String,
}

/// Employee row as returned by either the table endpoint (embedded
/// `departments`) or the `search_employees` function (flat `department_name`)
#[derive(Debug, Deserialize)]
struct EmployeeRow {
    id: String,
    first_name: String,
    last_name: String,
    email: Option<String>,
    phone_number: Option<String>,
    department_id: Option<String>,
    department_name: Option<String>,
    departments: Option<DepartmentName>,
    office: Option<String>,
    roles: Option<Vec<String>>,
    status: Option<String>,
}

impl From<EmployeeRow> for EmployeeRecord {
    fn from(row: EmployeeRow) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email.unwrap_or_default(),
            phone_number: row.phone_number.unwrap_or_default(),
            department_id: row.department_id,
            department_name: row.department_name.or(row.departments.map(|d| d.name)),
            office: row.office,
            roles: row.roles.unwrap_or_default(),
            status: row.status.unwrap_or_default(),
        }
    }
}

/// PostgREST (Supabase) directory client
pub struct SupabaseDirectory {
    client: reqwest::Client,
    base_url: Option<String>,
    api_key: Option<String>,
}

impl SupabaseDirectory {
    pub fn new(base_url: Option<String>, api_key: Option<String>) -> Self {
        Self {
            client: http_client(Duration::from_secs(15)),
            base_url: base_url.map(|url| url.trim_end_matches('/').to_string()),
            api_key,
        }
    }

    fn request(&self, method: Method, path: &str) -> DirectoryResult<RequestBuilder> {
        let (Some(base_url), Some(api_key)) = (&self.base_url, &self.api_key) else {
            return Err(DirectoryError::NotConfigured(
                "DIRECTORY_URL and DIRECTORY_API_KEY must be set".to_string(),
            ));
        };
        Ok(self
            .client
            .request(method, format!("{base_url}/rest/v1/{path}"))
            .header("apikey", api_key.as_str())
            .bearer_auth(api_key))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> DirectoryResult<T> {
        let response = builder
            .send()
            .await
            .map_err(|e| DirectoryError::Request(e.to_string()))?;
        if !response.status().is_success() {
            let (status, message) = error_body(response).await;
            return Err(DirectoryError::Status { status, message });
        }
        response
            .json()
            .await
            .map_err(|e| DirectoryError::InvalidResponse(e.to_string()))
    }

    async fn rpc<T: DeserializeOwned>(&self, function: &str, params: Value) -> DirectoryResult<T> {
        let builder = self.request(Method::POST, &format!("rpc/{function}"))?;
        self.send(builder.json(&params)).await
    }

    async fn insert(&self, table: &str, row: &impl serde::Serialize) -> DirectoryResult<String> {
        let builder = self
            .request(Method::POST, table)?
            .header("Prefer", "return=representation")
            .json(row);
        let rows: Vec<Value> = self.send(builder).await?;
        match rows.first().and_then(|row| row.get("id")) {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(Value::Number(id)) => Ok(id.to_string()),
            _ => Err(DirectoryError::InvalidResponse(format!(
                "insert into {table} returned no id"
            ))),
        }
    }

    async fn search_rpc(&self, query: &str, department: Option<&str>) -> DirectoryResult<Vec<EmployeeRow>> {
        self.rpc(
            "search_employees",
            json!({ "p_query": query, "p_department": department }),
        )
        .await
    }

    async fn employee_where(&self, column: &str, value: &str) -> DirectoryResult<Option<EmployeeRecord>> {
        let builder = self.request(Method::GET, "employees")?.query(&[
            ("select", EMPLOYEE_SELECT.to_string()),
            (column, format!("eq.{value}")),
            ("limit", "1".to_string()),
        ]);
        let rows: Vec<EmployeeRow> = self.send(builder).await?;
        Ok(rows.into_iter().next().map(EmployeeRecord::from))
    }
}

#[async_trait]
impl DirectoryClient for SupabaseDirectory {
    async fn search_employees(
        &self,
        query: &str,
        department: Option<&str>,
    ) -> DirectoryResult<Vec<EmployeeRecord>> {
        let query = query.trim();
        let parts: Vec<&str> = query.split_whitespace().collect();

        // The search function matches single words; full names are searched
        // word by word and filtered on the combined name
        let rows = if parts.len() > 1 {
            let wanted = query.to_lowercase();
            let mut seen = HashSet::new();
            let mut matched = Vec::new();
            for part in parts {
                for row in self.search_rpc(part, department).await? {
                    let full_name = format!("{} {}", row.first_name, row.last_name).to_lowercase();
                    if full_name.contains(&wanted) && seen.insert(row.id.clone()) {
                        matched.push(row);
                    }
                }
            }
            matched
        } else {
            self.search_rpc(query, department).await?
        };

        info!(
            query = %query,
            department = ?department,
            count = rows.len(),
            "Employee search completed"
        );
        Ok(rows.into_iter().map(EmployeeRecord::from).collect())
    }

    async fn get_employee_by_id(&self, employee_id: &str) -> DirectoryResult<Option<EmployeeRecord>> {
        self.employee_where("id", employee_id).await
    }

    async fn get_employee_by_phone(&self, phone: &str) -> DirectoryResult<Option<EmployeeRecord>> {
        self.employee_where("phone_number", phone).await
    }

    async fn is_employee_available(&self, employee_id: &str) -> DirectoryResult<bool> {
        let available: Option<bool> = self
            .rpc("is_employee_available", json!({ "p_employee_id": employee_id }))
            .await?;
        Ok(available.unwrap_or(false))
    }

    async fn get_departments(&self) -> DirectoryResult<Vec<DepartmentRecord>> {
        let builder = self
            .request(Method::GET, "departments")?
            .query(&[("select", "*"), ("order", "routing_priority.asc")]);
        self.send(builder).await
    }

    async fn get_company_info(&self) -> DirectoryResult<Option<CompanyInfoRecord>> {
        let builder = self
            .request(Method::GET, "company_info")?
            .query(&[("select", "*"), ("limit", "1")]);
        let rows: Vec<CompanyInfoRecord> = self.send(builder).await?;
        Ok(rows.into_iter().next())
    }

    async fn is_company_open(&self) -> DirectoryResult<bool> {
        let open: Option<bool> = self.rpc("is_company_open", json!({})).await?;
        // No configured hours means always open
        Ok(open.unwrap_or(true))
    }

    async fn log_call(&self, entry: &CallLogEntry) -> DirectoryResult<String> {
        let id = self.insert("call_logs", entry).await?;
        debug!(call_log_id = %id, status = %entry.status, "Call logged");
        Ok(id)
    }

    async fn save_message(&self, message: &NewMessage) -> DirectoryResult<String> {
        let id = self.insert("messages", message).await?;
        info!(message_id = %id, to_employee_id = %message.to_employee_id, "Message saved");
        Ok(id)
    }

    async fn update_message_status(
        &self,
        message_id: &str,
        update: &MessageStatusUpdate,
    ) -> DirectoryResult<()> {
        let builder = self
            .request(Method::PATCH, "messages")?
            .query(&[("id", format!("eq.{message_id}"))])
            .header("Prefer", "return=minimal")
            .json(update);
        let response = builder
            .send()
            .await
            .map_err(|e| DirectoryError::Request(e.to_string()))?;
        if !response.status().is_success() {
            let (status, message) = error_body(response).await;
            return Err(DirectoryError::Status { status, message });
        }
        Ok(())
    }
}
