//! 规则词法分析
//!
//! 在括号两侧补空格后按空白切分。不识别引号，
//! 带空白的字符串字面量（如 `'New York'`）会被拆成多个词法单元。

/// 将规则字符串切分为词法单元序列（保持原始顺序）
pub fn tokenize(input: &str) -> Vec<String> {
    let mut spaced = String::with_capacity(input.len() + 8);
    for ch in input.chars() {
        match ch {
            '(' | ')' => {
                spaced.push(' ');
                spaced.push(ch);
                spaced.push(' ');
            }
            _ => spaced.push(ch),
        }
    }

    spaced.split_whitespace().map(str::to_string).collect()
}
