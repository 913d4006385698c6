//! Department management: create, look up, deactivate.

use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use docvault_core::error::AppError;
use docvault_core::events::LifecycleEvent;
use docvault_core::result::AppResult;
use docvault_core::types::DepartmentId;
use docvault_database::{HierarchyStore, SharedStore};
use docvault_entity::department::Department;

use crate::context::RequestContext;
use crate::hierarchy::validate_name;
use crate::lifecycle::LifecycleOutcome;

/// Request to create a department.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateDepartmentRequest {
    /// Globally unique display name.
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Short code.
    #[validate(length(min = 1, max = 32))]
    pub code: String,
}

/// Manages the roots of the folder trees.
#[derive(Debug, Clone)]
pub struct DepartmentService {
    store: SharedStore,
    max_name_length: usize,
}

impl DepartmentService {
    /// Creates a new department service.
    pub fn new(store: SharedStore, max_name_length: usize) -> Self {
        Self {
            store,
            max_name_length,
        }
    }

    /// Create an active department. Names are unique across the system.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        req: CreateDepartmentRequest,
    ) -> AppResult<LifecycleOutcome<Department>> {
        req.validate()
            .map_err(|e| AppError::validation(format!("Invalid department: {e}")))?;
        let name = validate_name(&req.name, self.max_name_length)?;
        let code = req.code.trim().to_uppercase();

        if self.store.find_department_by_name(&name).await?.is_some() {
            return Err(AppError::invalid_operation(format!(
                "Department '{name}' already exists"
            )));
        }

        let department = self
            .store
            .insert_department(&Department::new(name, code))
            .await?;

        info!(
            user_id = %ctx.user_id,
            department_id = %department.id,
            name = %department.name,
            "Department created"
        );
        let event = LifecycleEvent::DepartmentCreated {
            department_id: department.id,
            name: department.name.clone(),
        };
        Ok(LifecycleOutcome::new(department, event))
    }

    /// A department by id.
    pub async fn get(&self, id: DepartmentId) -> AppResult<Department> {
        self.store
            .find_department(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Department {id} not found")))
    }

    /// Every department, by name.
    pub async fn list(&self) -> AppResult<Vec<Department>> {
        self.store.list_departments().await
    }

    /// Stop a department from accepting new children. Existing nodes stay
    /// where they are and can still be renamed or deleted.
    pub async fn deactivate(
        &self,
        ctx: &RequestContext,
        id: DepartmentId,
    ) -> AppResult<LifecycleOutcome<Department>> {
        let department = self.get(id).await?;
        if !department.is_active {
            return Err(AppError::invalid_operation(format!(
                "Department {id} is already inactive"
            )));
        }

        let department = self.store.set_department_active(id, false).await?;
        info!(user_id = %ctx.user_id, department_id = %id, "Department deactivated");
        Ok(LifecycleOutcome::new(
            department,
            LifecycleEvent::DepartmentDeactivated { department_id: id },
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use docvault_core::error::ErrorKind;
    use docvault_database::MemoryStore;

    use super::*;

    fn service() -> DepartmentService {
        DepartmentService::new(Arc::new(MemoryStore::new()), 255)
    }

    fn request(name: &str, code: &str) -> CreateDepartmentRequest {
        CreateDepartmentRequest {
            name: name.to_string(),
            code: code.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let svc = service();
        let ctx = RequestContext::system();
        let created = svc.create(&ctx, request("Sales", "sls")).await.unwrap();
        assert_eq!(created.value.code, "SLS");
        svc.create(&ctx, request("Engineering", "ENG")).await.unwrap();

        let names: Vec<String> = svc.list().await.unwrap().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["Engineering", "Sales"]);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let svc = service();
        let ctx = RequestContext::system();
        svc.create(&ctx, request("Sales", "S1")).await.unwrap();
        let err = svc.create(&ctx, request(" Sales ", "S2")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidOperation);
    }

    #[tokio::test]
    async fn test_name_with_separator_rejected() {
        let svc = service();
        let err = svc
            .create(&RequestContext::system(), request("A/B", "AB"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_deactivate_twice() {
        let svc = service();
        let ctx = RequestContext::system();
        let dept = svc.create(&ctx, request("Ops", "OPS")).await.unwrap().value;

        let outcome = svc.deactivate(&ctx, dept.id).await.unwrap();
        assert!(!outcome.value.is_active);
        let err = svc.deactivate(&ctx, dept.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidOperation);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let err = service().get(DepartmentId::new()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
