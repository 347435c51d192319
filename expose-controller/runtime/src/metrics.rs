use crate::error::Error;
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family},
    registry::Registry,
};

/// Counts reconciliations by outcome.
#[derive(Clone, Debug, Default)]
pub struct ExposeMetrics {
    exposes: Family<ResultLabels, Counter>,
    unexposes: Family<ResultLabels, Counter>,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct ResultLabels {
    result: &'static str,
}

// === impl ExposeMetrics ===

impl ExposeMetrics {
    pub fn register(reg: &mut Registry) -> Self {
        let exposes = Family::<ResultLabels, Counter>::default();
        reg.register(
            "exposes",
            "Count of service expose reconciliations by result",
            exposes.clone(),
        );

        let unexposes = Family::<ResultLabels, Counter>::default();
        reg.register(
            "unexposes",
            "Count of service unexpose reconciliations by result",
            unexposes.clone(),
        );

        Self { exposes, unexposes }
    }

    pub(crate) fn expose(&self, result: &Result<(), Error>) {
        self.exposes.get_or_create(&ResultLabels::new(result)).inc();
    }

    pub(crate) fn unexpose(&self, result: &Result<(), Error>) {
        self.unexposes.get_or_create(&ResultLabels::new(result)).inc();
    }

    #[cfg(test)]
    pub(crate) fn exposes(&self, result: &'static str) -> u64 {
        self.exposes.get_or_create(&ResultLabels { result }).get()
    }

    #[cfg(test)]
    pub(crate) fn unexposes(&self, result: &'static str) -> u64 {
        self.unexposes.get_or_create(&ResultLabels { result }).get()
    }
}

impl ResultLabels {
    fn new(result: &Result<(), Error>) -> Self {
        let result = match result {
            Ok(()) => "ok",
            Err(error) if error.is_conflict() => "conflict",
            Err(_) => "error",
        };
        Self { result }
    }
}
