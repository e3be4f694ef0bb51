//! Facade wiring every component of one integration instance.
//!
//! Construct one [`OtpService`] per configured lock; it owns its
//! configuration and transport, so several instances can coexist.

use std::sync::Arc;

use nuki_otp_core::{AuthCode, OtpConfig, OtpReadout};
use nuki_otp_events::EventBus;

use crate::error::NukiResult;
use crate::evaluator::CodeEvaluator;
use crate::housekeeper::{Housekeeper, HousekeepingReport};
use crate::lifecycle::OtpSwitch;
use crate::repository::{CodeRepository, IssuedCode};
use crate::transport::{NukiTransport, RetryPolicy};

/// Result of a refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSnapshot {
    pub codes: Vec<AuthCode>,
}

impl CodeSnapshot {
    /// The code shown to users: the first one listed.
    pub fn current(&self) -> Option<&AuthCode> {
        self.codes.first()
    }

    pub fn has_active_code(&self) -> bool {
        !self.codes.is_empty()
    }

    pub fn readout(&self, lifetime_hours: u32) -> OtpReadout {
        OtpReadout::from_codes(&self.codes, lifetime_hours)
    }
}

/// One-time code management for a single lock.
#[derive(Clone)]
pub struct OtpService {
    config: Arc<OtpConfig>,
    repository: CodeRepository,
    evaluator: CodeEvaluator,
    housekeeper: Housekeeper,
    switch: OtpSwitch,
    bus: Arc<EventBus>,
}

impl OtpService {
    /// Build a service with the default retry policy.
    pub fn new(config: OtpConfig, bus: Arc<EventBus>) -> NukiResult<Self> {
        Self::with_policy(config, RetryPolicy::default(), bus)
    }

    /// Build a service with explicit transport tuning.
    pub fn with_policy(config: OtpConfig, policy: RetryPolicy, bus: Arc<EventBus>) -> NukiResult<Self> {
        config.check()?;

        let transport = Arc::new(NukiTransport::new(&config, policy)?);
        let config = Arc::new(config);
        let repository = CodeRepository::new(transport, Arc::clone(&config));
        let evaluator = CodeEvaluator::new(repository.clone());
        let housekeeper = Housekeeper::new(repository.clone(), evaluator.clone());
        let switch = OtpSwitch::new(repository.clone(), Arc::clone(&bus));

        Ok(Self {
            config,
            repository,
            evaluator,
            housekeeper,
            switch,
            bus,
        })
    }

    pub fn config(&self) -> &OtpConfig {
        &self.config
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn repository(&self) -> &CodeRepository {
        &self.repository
    }

    pub fn evaluator(&self) -> &CodeEvaluator {
        &self.evaluator
    }

    pub async fn list_codes(&self) -> NukiResult<Vec<AuthCode>> {
        self.repository.list_codes().await
    }

    pub async fn create_code(&self) -> NukiResult<IssuedCode> {
        self.repository.create_code().await
    }

    pub async fn delete_codes(&self, codes: &[AuthCode]) -> NukiResult<()> {
        self.repository.delete_codes(codes).await
    }

    pub async fn run_housekeeping(&self) -> HousekeepingReport {
        self.housekeeper.run().await
    }

    pub async fn turn_on(&self) -> NukiResult<IssuedCode> {
        self.switch.turn_on().await
    }

    pub async fn turn_off(&self) -> NukiResult<()> {
        self.switch.turn_off().await
    }

    pub async fn is_on(&self) -> NukiResult<bool> {
        self.switch.is_on().await
    }

    pub async fn verify_code(&self, entered: u32) -> NukiResult<bool> {
        self.evaluator.verify(entered).await
    }

    /// Housekeeping followed by a fresh listing.
    ///
    /// Housekeeping problems are only logged; a failed listing is returned
    /// so the host can mark its observers unavailable.
    pub async fn refresh(&self) -> NukiResult<CodeSnapshot> {
        self.housekeeper.run().await;
        let codes = self.repository.list_codes().await?;
        Ok(CodeSnapshot { codes })
    }

    /// Refresh and render the readout in one step.
    pub async fn readout(&self) -> NukiResult<OtpReadout> {
        let snapshot = self.refresh().await?;
        Ok(snapshot.readout(self.config.lifetime_hours))
    }
}
