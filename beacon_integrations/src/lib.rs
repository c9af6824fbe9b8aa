//! Remote notification feed clients implementing `beacon_core::NotificationsApi`.

pub mod connectors;
