use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{
    CallLogEntry, CompanyInfoRecord, DepartmentRecord, DirectoryClient, DirectoryResult,
    EmployeeRecord, MessageStatusUpdate, NewMessage,
};

/// Caches the slow-changing directory data: company info and departments
///
/// Everything else passes straight through. Failed lookups are not cached.
pub struct CachedDirectory {
    inner: Arc<dyn DirectoryClient>,
    company: Cache<(), Option<CompanyInfoRecord>>,
    departments: Cache<(), Vec<DepartmentRecord>>,
}

impl CachedDirectory {
    pub fn new(inner: Arc<dyn DirectoryClient>, ttl: Duration) -> Self {
        Self {
            inner,
            company: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
            departments: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
        }
    }

    pub async fn invalidate(&self) {
        self.company.invalidate_all();
        self.departments.invalidate_all();
    }
}

#[async_trait]
impl DirectoryClient for CachedDirectory {
    async fn search_employees(
        &self,
        query: &str,
        department: Option<&str>,
    ) -> DirectoryResult<Vec<EmployeeRecord>> {
        self.inner.search_employees(query, department).await
    }

    async fn get_employee_by_id(&self, employee_id: &str) -> DirectoryResult<Option<EmployeeRecord>> {
        self.inner.get_employee_by_id(employee_id).await
    }

    async fn get_employee_by_phone(&self, phone: &str) -> DirectoryResult<Option<EmployeeRecord>> {
        self.inner.get_employee_by_phone(phone).await
    }

    async fn is_employee_available(&self, employee_id: &str) -> DirectoryResult<bool> {
        self.inner.is_employee_available(employee_id).await
    }

    async fn get_departments(&self) -> DirectoryResult<Vec<DepartmentRecord>> {
        if let Some(departments) = self.departments.get(&()).await {
            debug!("Departments served from cache");
            return Ok(departments);
        }
        let departments = self.inner.get_departments().await?;
        self.departments.insert((), departments.clone()).await;
        Ok(departments)
    }

    async fn get_company_info(&self) -> DirectoryResult<Option<CompanyInfoRecord>> {
        if let Some(info) = self.company.get(&()).await {
            debug!("Company info served from cache");
            return Ok(info);
        }
        let info = self.inner.get_company_info().await?;
        self.company.insert((), info.clone()).await;
        Ok(info)
    }

    async fn is_company_open(&self) -> DirectoryResult<bool> {
        self.inner.is_company_open().await
    }

    async fn log_call(&self, entry: &CallLogEntry) -> DirectoryResult<String> {
        self.inner.log_call(entry).await
    }

    async fn save_message(&self, message: &NewMessage) -> DirectoryResult<String> {
        self.inner.save_message(message).await
    }

    async fn update_message_status(
        &self,
        message_id: &str,
        update: &MessageStatusUpdate,
    ) -> DirectoryResult<()> {
        self.inner.update_message_status(message_id, update).await
    }
}
