//! Domain entities - Core business objects with no external dependencies

pub mod user;
pub mod guild;
pub mod interaction;
pub mod command;

pub use user::User;
pub use guild::Guild;
pub use interaction::{Interaction, InteractionKind, CommandData, CommandKind, CommandArgument};
pub use command::{Command, CommandHandler, CommandOption, OptionKind, CommandRegistry, RegisteredCommand};
