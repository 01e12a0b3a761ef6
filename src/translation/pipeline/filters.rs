//! 文本过滤器模块
//!
//! 在文本进入翻译管道之前清理标记、解码HTML实体，并按消息规则改写或丢弃文本。

use std::sync::OnceLock;

use regex::Regex;

static BR_TAG: OnceLock<Regex> = OnceLock::new();
static ANY_TAG: OnceLock<Regex> = OnceLock::new();
static MULTI_SPACE: OnceLock<Regex> = OnceLock::new();

fn cached(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("内置正则表达式必须有效"))
}

/// 去除残留的标记
///
/// `<br>` 替换为空格，其余标签删除，连续空格合并，最后去除首尾空白。
pub fn strip_markup(text: &str) -> String {
    let text = cached(&BR_TAG, r"(?i)<br\s*/?>").replace_all(text, " ");
    let text = cached(&ANY_TAG, r"<.*?>").replace_all(&text, "");
    let text = cached(&MULTI_SPACE, r" {2,}").replace_all(&text, " ");
    text.trim().to_string()
}

/// 解码HTML实体，无法识别的实体原样保留
pub fn unescape_html(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

/// 单条消息规则
///
/// 整条文本匹配时生效：没有替换模板则丢弃该消息，否则用捕获组生成新文本。
#[derive(Debug, Clone)]
pub struct ParsePattern {
    matcher: Regex,
    replacement: Option<String>,
}

impl ParsePattern {
    /// 丢弃匹配的消息
    pub fn skip(pattern: &str) -> Result<Self, regex::Error> {
        Self::build(pattern, None)
    }

    /// 用替换模板（如 `"$1 $2"`）改写匹配的消息
    pub fn rewrite(pattern: &str, replacement: &str) -> Result<Self, regex::Error> {
        Self::build(pattern, Some(replacement.to_string()))
    }

    fn build(pattern: &str, replacement: Option<String>) -> Result<Self, regex::Error> {
        // `.` 匹配换行，规则可以跨行
        let matcher = Regex::new(&format!("(?s)^(?:{})$", pattern))?;
        Ok(Self {
            matcher,
            replacement,
        })
    }
}

/// 消息过滤器，按顺序尝试规则，第一条匹配的规则生效
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    patterns: Vec<ParsePattern>,
}

impl MessageFilter {
    pub fn new(patterns: Vec<ParsePattern>) -> Self {
        Self { patterns }
    }

    /// 返回 `None` 表示该消息不需要翻译
    pub fn apply(&self, origin: &str) -> Option<String> {
        for pattern in &self.patterns {
            if let Some(caps) = pattern.matcher.captures(origin) {
                let template = pattern.replacement.as_deref()?;
                let mut output = String::new();
                caps.expand(template, &mut output);
                return Some(output);
            }
        }

        Some(origin.to_string())
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// 游戏聊天消息规则
    pub fn chat() -> Self {
        Self::from_rules(presets::CHAT)
    }

    /// 对话框规则
    pub fn dialogue() -> Self {
        Self::from_rules(presets::DIALOGUE)
    }

    /// 头顶文字规则
    pub fn overhead() -> Self {
        Self::from_rules(presets::OVERHEAD)
    }

    fn from_rules(rules: &[(&str, Option<&str>)]) -> Self {
        let patterns = rules
            .iter()
            .filter_map(|(pattern, replacement)| {
                let built = match replacement {
                    Some(replacement) => ParsePattern::rewrite(pattern, replacement),
                    None => ParsePattern::skip(pattern),
                };
                built
                    .map_err(|e| tracing::warn!("忽略无效的消息规则 {}: {}", pattern, e))
                    .ok()
            })
            .collect();

        Self { patterns }
    }
}

/// 内置消息规则：数字、计数等每次都不同的内容会被去掉或整条跳过
mod presets {
    pub(super) const CHAT: &[(&str, Option<&str>)] = &[
        (r"[0-9,]+ x (Coins\.)", Some("$1")),
        (r"Your .+ lap count is: <col=[0-9A-Fa-f]+>[0-9,]+</col>\.", None),
        (r"You can inflict [0-9,]+ more points of damage before a ring will shatter\.", None),
        (
            r"(Your reward is:) <col=[0-9A-Fa-f]+>[0-9,]+</col> x (<col=[0-9A-Fa-f]+>.+</col>\.)",
            Some("$1 $2"),
        ),
        (
            r"(Your reward is:) <col=[0-9A-Fa-f]+>[0-9,]+</col> x (<col=[0-9A-Fa-f]+>.+</col> and it has been placed on the ground\.)",
            Some("$1 $2"),
        ),
        (r"You have opened the Brimstone chest once\.", None),
        (r"You have opened the Brimstone chest [0-9,]+ times\.", None),
        (
            r"Congratulations, you've just advanced your .+ level\. You are now level [0-9,]+\.",
            None,
        ),
        (r"Congratulations, you've reached a total level of [0-9,]+\.", None),
        (
            r"Congratulations, you've completed .+ combat task: <col=[0-9A-Fa-f]+>.+</col>\.",
            None,
        ),
        (
            r"<col=[0-9A-Fa-f]+>Well done! You have completed .+ task in the .+ area\. Your Achievement Diary has been updated\.</col>",
            None,
        ),
        (
            r"(<col=[0-9A-Fa-f]+>You're assigned to kill </col>.+<col=[0-9A-Fa-f]+>); only </col>[0-9,]+<col=[0-9A-Fa-f]+> more to go\.",
            Some("$1."),
        ),
        (
            r"<col=[0-9A-Fa-f]+>You've completed </col>[0-9,]+ tasks <col=[0-9A-Fa-f]+>in a row and currently have a total of </col>[0-9,]+ points<col=[0-9A-Fa-f]+>\.",
            None,
        ),
        (
            r"(<col=[0-9A-Fa-f]+>You have completed your task! You killed</col>) [0-9,]+ (.+<col=[0-9A-Fa-f]+>\.) You gained</col> [0-9,]+ xp<col=[0-9A-Fa-f]+>\.",
            Some("$1 $2"),
        ),
        (
            r"<col=[0-9A-Fa-f]+>You've completed </col>[0-9,]+ tasks <col=[0-9A-Fa-f]+>and received </col>[0-9,]+ points<col=[0-9A-Fa-f]+>, giving you a total of </col>[0-9,]+<col=[0-9A-Fa-f]+>; return to a Slayer master\.</col>",
            None,
        ),
        (r"You've been awarded [0-9,]+ bonus Runecraft XP for closing the rift\.", None),
        (r"Amount of rifts you have closed: <col=[0-9A-Fa-f]+>[0-9,]+</col>\.", None),
        (
            r"Total elemental energy: <col=[0-9A-Fa-f]+>[0-9,]+</col>\. Total catalytic energy:  <col=[0-9A-Fa-f]+>[0-9,]+</col>\.",
            None,
        ),
        (
            r"Elemental energy attuned: <col=[0-9A-Fa-f]+>[0-9,]+</col>\. Catalytic energy attuned: <col=[0-9A-Fa-f]+>[0-9,]+</col>\.",
            None,
        ),
        (r"<col=[0-9A-Fa-f]+>.+ received a drop: .+</col>", None),
    ];

    pub(super) const DIALOGUE: &[(&str, Option<&str>)] = &[
        (
            r"(Congratulations, you've just advanced your .+ level\.) You are now level [0-9,]+\.",
            Some("$1"),
        ),
        (
            r"(Your brain power serves you well!<br>You have been awarded) [0-9,]+ (.+ experience!)",
            Some("$1 $2"),
        ),
        (r"(Your new task is to kill) [0-9,]+ (.+\.)", Some("$1 $2")),
        (
            r"(You're currently assigned to kill .+); only<br>[0-9,]+ more to go\. Your reward point tally is [0-9,]+\.",
            Some("$1."),
        ),
        (r"Select an Option\nExchange '.+': 5 coins\n.*Cancel", None),
    ];

    pub(super) const OVERHEAD: &[(&str, Option<&str>)] = &[(r"[0-9,]+", None)];
}
