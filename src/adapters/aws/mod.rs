pub mod athena;
pub mod quicksight;
pub mod session;
pub mod signed_client;

pub use athena::AthenaClient;
pub use quicksight::QuickSightClient;
pub use session::AwsSession;
pub use signed_client::SignedClient;
