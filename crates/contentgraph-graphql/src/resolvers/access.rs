//! Access checks made during resolution.
//!
//! Every decision's cacheability is folded into the response, whether the
//! check passes or not.

use contentgraph_storage::{AccessOperation, AccessTarget, EntityRecord, FieldDescriptor};
use tracing::trace;

use crate::context::ResolutionContext;
use crate::error::GraphQLError;

/// Access checks against the store, recording cacheability.
pub struct EntityAccess;

impl EntityAccess {
    /// Whether the requesting account may view the entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn can_view(
        ctx: &ResolutionContext,
        record: &EntityRecord,
    ) -> Result<bool, GraphQLError> {
        Self::can(ctx, record, AccessOperation::View).await
    }

    /// Whether the requesting account may perform `operation` on the entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn can(
        ctx: &ResolutionContext,
        record: &EntityRecord,
        operation: AccessOperation,
    ) -> Result<bool, GraphQLError> {
        let result = ctx
            .store
            .check_access(AccessTarget::Entity(record), operation, &ctx.account)
            .await?;
        ctx.add_cacheability(&result.cacheability);

        if !result.allowed {
            trace!(entity = %record.cache_tag(), ?operation, "Entity access denied");
        }
        Ok(result.allowed)
    }

    /// Whether the requesting account may view a field of the entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn field_visible(
        ctx: &ResolutionContext,
        record: &EntityRecord,
        field: &FieldDescriptor,
    ) -> Result<bool, GraphQLError> {
        let result = ctx
            .store
            .check_access(
                AccessTarget::Field {
                    entity: record,
                    field,
                },
                AccessOperation::View,
                &ctx.account,
            )
            .await?;
        ctx.add_cacheability(&result.cacheability);

        if !result.allowed {
            trace!(
                entity = %record.cache_tag(),
                field = %field.machine_name,
                "Field access denied"
            );
        }
        Ok(result.allowed)
    }
}
