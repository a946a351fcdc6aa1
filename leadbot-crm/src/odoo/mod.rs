//! Odoo CRM over the external JSON-RPC API.
//!
//! Leads are `crm.lead` records; meetings are `mail.activity` records attached
//! to the lead.

mod client;
mod config;

pub use client::{DEFAULT_MEETING_ACTIVITY_TYPE, OdooClient};
pub use config::OdooConfig;
