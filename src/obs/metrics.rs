// self
use crate::obs::{FlowKind, FlowOutcome, RetryReason};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"dpop_client_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records a transparent retry via the global metrics recorder (when enabled).
pub fn record_retry(reason: RetryReason) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("dpop_client_retry_total", "reason" => reason.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = reason;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_noop_without_metrics() {
		record_flow_outcome(FlowKind::Refresh, FlowOutcome::Failure);
		record_retry(RetryReason::Nonce);
	}
}
