mod bookmark;
mod comment;
mod follow;
mod like;
mod subscription;
mod target;
mod text_post;
mod tier;
mod tip;
mod user;
mod video;

pub use bookmark::*;
pub use comment::*;
pub use follow::*;
pub use like::*;
pub use subscription::*;
pub use target::*;
pub use text_post::*;
pub use tier::*;
pub use tip::*;
pub use user::*;
pub use video::*;
