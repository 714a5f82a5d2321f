pub mod api_email;
pub mod db_email;
pub mod parsed_message;

pub use db_email::{DbEmail, EmailType};
pub use parsed_message::{EmailAddress, ParsedAttachment, ParsedMessage};
