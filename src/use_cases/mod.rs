//! Application use cases orchestrating the domain over the ports.

pub mod employer_views;
pub mod review_return;
pub mod settle_challan;
pub mod submit_return;

pub use employer_views::EmployerViews;
pub use review_return::ReviewReturn;
pub use settle_challan::SettleChallan;
pub use submit_return::{SubmitReturn, SubmitReturnInput, SubmitReturnOutput};
