//! The propagation engine behind the capability map's effective views.
//!
//! Three independent projections keep inheritance-aware read models in step
//! with the event stream:
//!
//! - [`BusinessDomainPropagator`]: effective business-domain ownership,
//!   inherited from each capability's L1 ancestor.
//! - [`ImportanceRecomputer`] (with [`ImportanceResolver`]): effective
//!   strategic importance per pillar and business domain, resolved from the
//!   nearest explicitly rated ancestor.
//! - [`RealizationInheritancePropagator`]: inherited system realizations on
//!   every ancestor of a directly linked capability.
//!
//! [`FactsProjector`] maintains the hierarchy and reference facts the three
//! read from, and [`ProjectionPipeline`] runs all four in order for one event.
//!
//! Every handler is idempotent: redelivering an event after a failure leaves
//! the views as if it had been applied once.

#![allow(async_fn_in_trait)]

use std::future::Future;

use capmap_core::event::CapabilityEvent;

pub mod business_domain;
pub mod error;
pub mod facts;
pub mod importance;
pub mod pipeline;
pub mod realization;
pub mod walk;

pub use business_domain::BusinessDomainPropagator;
pub use error::{Error, Result};
pub use facts::FactsProjector;
pub use importance::{ImportanceRecomputer, ImportanceResolver, ResolvedImportance};
pub use pipeline::{ProjectionBackend, ProjectionPipeline, PropagationSettings};
pub use realization::{RealizationInheritancePropagator, StaleInheritancePolicy};

/// A projection fed one event at a time, in emission order.
pub trait Projector: Send + Sync {
  /// Apply a decoded event. Events the projection does not care about are a
  /// no-op.
  fn project(&self, event: &CapabilityEvent) -> impl Future<Output = Result<()>> + Send;

  /// Decode the store's `(event_type, event_data)` pair and apply it.
  /// Unknown event types are ignored.
  fn project_event(
    &self,
    event_type: &str,
    event_data: &[u8],
  ) -> impl Future<Output = Result<()>> + Send {
    async move {
      match CapabilityEvent::decode(event_type, event_data)? {
        Some(event) => self.project(&event).await,
        None => {
          tracing::debug!(event_type, "ignoring unknown event type");
          Ok(())
        }
      }
    }
  }
}

#[cfg(test)]
mod tests;
