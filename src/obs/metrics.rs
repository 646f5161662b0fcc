// self
use crate::obs::{AuthOutcome, AuthStage};

/// Increments `gateway_auth_total` for the stage and outcome (when `metrics` is enabled).
pub fn record_outcome(stage: AuthStage, outcome: AuthOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"gateway_auth_total",
			"stage" => stage.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (stage, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_outcome_without_recorder_is_silent() {
		record_outcome(AuthStage::RoleFilter, AuthOutcome::Failure);
		record_outcome(AuthStage::TokenRefresh, AuthOutcome::Attempt);
	}
}
