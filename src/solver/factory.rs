use crate::domain::{
    solver_service::{SolverError, SolverService},
    value_objects::SolverBackend,
};
use crate::solver::MicrolpSolver;
use std::sync::Arc;

/// Factory for creating solver instances based on configuration
pub struct SolverFactory;

impl SolverFactory {
    /// Create a solver for a specific backend
    ///
    /// `Auto` picks the strongest engine compiled in: HiGHS, then CBC, then microlp.
    pub fn create_from_backend(backend: SolverBackend) -> Result<Arc<dyn SolverService>, SolverError> {
        match backend {
            SolverBackend::Auto => Ok(Self::default_solver()),
            SolverBackend::Microlp => Ok(Arc::new(MicrolpSolver::new())),
            SolverBackend::CoinCbc => Self::coin_cbc(),
            SolverBackend::Highs => Self::highs(),
        }
    }

    /// Get the default solver
    pub fn default_solver() -> Arc<dyn SolverService> {
        Self::highs()
            .or_else(|_| Self::coin_cbc())
            .unwrap_or_else(|_| Arc::new(MicrolpSolver::new()))
    }

    #[cfg(feature = "highs")]
    fn highs() -> Result<Arc<dyn SolverService>, SolverError> {
        Ok(Arc::new(crate::solver::HighsSolver::new()))
    }

    #[cfg(not(feature = "highs"))]
    fn highs() -> Result<Arc<dyn SolverService>, SolverError> {
        Err(SolverError::SolverNotAvailable(
            "HiGHS support not compiled in (enable the `highs` feature)".to_string(),
        ))
    }

    #[cfg(feature = "coin_cbc")]
    fn coin_cbc() -> Result<Arc<dyn SolverService>, SolverError> {
        Ok(Arc::new(crate::solver::CoinCbcSolver::new()))
    }

    #[cfg(not(feature = "coin_cbc"))]
    fn coin_cbc() -> Result<Arc<dyn SolverService>, SolverError> {
        Err(SolverError::SolverNotAvailable(
            "COIN-OR CBC support not compiled in (enable the `coin_cbc` feature)".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn microlp_is_always_available() {
        let solver = SolverFactory::create_from_backend(SolverBackend::Microlp).unwrap();
        assert_eq!(solver.name(), "microlp");
        assert!(!SolverFactory::default_solver().name().is_empty());
    }

    #[cfg(not(feature = "highs"))]
    #[test]
    fn missing_backend_is_reported() {
        let err = SolverFactory::create_from_backend(SolverBackend::Highs)
            .err()
            .unwrap();
        assert!(matches!(err, SolverError::SolverNotAvailable(_)));
    }
}
