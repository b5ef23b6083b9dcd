pub mod api;
pub mod gateway;
pub mod plans;

pub use api::{create_payment, PaymentRequest, PaymentResponse, TokensGranted};
pub use gateway::{GatewayError, PaymentGateway, PaymentIntent};
pub use plans::{PlanDefinition, UNLIMITED_TOKENS};
