use super::{Step, Task, TaskContext, TaskDescriptor, TaskPayload, TaskSuccess, TaskType};
use crate::destination::DestId;
use serde::{Deserialize, Serialize};

/// Payload of a delete-products task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletePayload {
    /// Destination products to delete.
    pub ids: Vec<DestId>,
}

pub(crate) struct DeleteProductsTask;

impl Task for DeleteProductsTask {
    const TYPE: TaskType = TaskType::DeleteProducts;
    type Payload = DeletePayload;

    fn build(payload: DeletePayload) -> TaskDescriptor {
        TaskDescriptor::new(TaskPayload::DeleteProducts(payload))
    }

    fn run(ctx: &TaskContext<'_>, payload: &DeletePayload) -> Step {
        if payload.ids.is_empty() {
            return Ok(TaskSuccess::AlreadyDone);
        }
        ctx.destination.delete_products(&payload.ids)?;
        Ok(TaskSuccess::Done)
    }
}
