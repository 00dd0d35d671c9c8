use smashbot_core::{Catalog, StoreError, VoteStore};
use tracing::info;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub checked: usize,
}

/// Ensures every catalog item has a zeroed vote record. Existing counts are untouched.
pub async fn reconcile_catalog(
    store: &dyn VoteStore,
    catalog: &Catalog,
) -> Result<ReconcileReport, StoreError> {
    let mut report = ReconcileReport::default();
    for item in catalog.all() {
        store.ensure_exists(&item.key()).await?;
        report.checked += 1;
    }

    info!(
        event_name = "system.catalog.reconciled",
        checked = report.checked,
        "catalog vote records reconciled"
    );
    Ok(report)
}
