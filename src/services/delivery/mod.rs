//! 激活码投递模块
//!
//! 新签发的激活码通过两步投递给终端用户：
//! - 发布到 paste 站点（失败即整个签发失败）
//! - 可选的短链缩短（失败时回退到原始 paste 链接）

mod channel;
mod http;
mod link4m;
mod pastebin;

pub use channel::{
    Delivery, DeliveryChannel, KeyNote, LinkShortener, PasteHost, PublishedPaste,
};
pub use link4m::Link4mShortener;
pub use pastebin::PastebinHost;
