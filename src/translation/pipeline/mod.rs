//! 翻译管道模块
//!
//! 文本进入翻译流程之前的处理：去除标记、解码HTML实体、按规则改写或屏蔽消息

pub mod filters;

pub use filters::{strip_markup, unescape_html, MessageFilter, ParsePattern};
