//! Batch planning: assign final ids to a replace-all batch

use crate::backend::IdScan;
use dmp_model::{IdAllocator, Product, ProductInput};
use std::time::SystemTime;

/// Turn validated inputs into the exact batch to write
///
/// Explicit ids are kept verbatim. Id-less inputs draw from an allocator
/// seeded with every stored id, every explicit id in the batch, and the
/// high-water mark. When the scan failed the allocator falls back to a
/// clock-derived counter; that path can collide with unseen stored ids and
/// is logged at error level.
#[must_use]
pub fn plan_batch(inputs: Vec<ProductInput>, scan: IdScan) -> Vec<Product> {
    plan_batch_at(inputs, scan, SystemTime::now())
}

pub(crate) fn plan_batch_at(
    inputs: Vec<ProductInput>,
    scan: IdScan,
    now: SystemTime,
) -> Vec<Product> {
    let explicit: Vec<String> = inputs
        .iter()
        .filter_map(ProductInput::explicit_id)
        .map(str::to_string)
        .collect();

    let mut allocator = match scan {
        Ok(snapshot) => {
            tracing::debug!(
                stored = snapshot.ids.len(),
                explicit = explicit.len(),
                high_water = snapshot.high_water,
                "seeding id allocator"
            );
            IdAllocator::seeded(
                snapshot.ids.into_iter().chain(explicit),
                snapshot.high_water,
            )
        }
        Err(err) => {
            let allocator = IdAllocator::fallback(explicit, now);
            tracing::error!(
                error = %err,
                start = allocator.peek_sequence(),
                "stored id scan failed; allocating from clock-derived counter"
            );
            allocator
        }
    };

    let mut generated = 0usize;
    let batch: Vec<Product> = inputs
        .into_iter()
        .map(|input| {
            let id = match input.explicit_id() {
                Some(id) => id.to_string(),
                None => {
                    generated += 1;
                    allocator.next_id()
                }
            };
            tracing::debug!(%id, name = %input.attributes.name, "planned product");
            input.into_product(id)
        })
        .collect();

    tracing::info!(total = batch.len(), generated, "replace-all batch planned");
    batch
}
