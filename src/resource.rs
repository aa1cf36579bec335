use async_trait::async_trait;

use crate::error::CheckError;
use crate::metric::Metric;

/// Acquisition: the domain model of whatever a check measures.
///
/// Implementations model the relevant details of the monitored system
/// and produce metrics from it. `probe` is the only method the check
/// controller calls; it should trigger all necessary actions and
/// return the measured metrics. Acquisition failures are reported as
/// [`CheckError`] and become an Unknown result for this resource while
/// other resources still run.
#[async_trait]
pub trait Resource: Send + Sync {
    fn name(&self) -> &str;

    async fn probe(&self) -> Result<Vec<Metric>, CheckError>;
}
