use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    Keyword,
    String,
    Number,
    Identifier,
    Operator,
    Comment,
    /// A commented-out statement left for manual review.
    DisabledStatement,
    Whitespace,
    Punctuation,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub text: String,
}

impl Token {
    fn new(token_type: TokenType, text: String) -> Self {
        Self { token_type, text }
    }

    pub fn style(&self) -> Style {
        match self.token_type {
            TokenType::Keyword => Style::default().fg(Color::Cyan),
            TokenType::String => Style::default().fg(Color::Green),
            TokenType::Number => Style::default().fg(Color::Yellow),
            TokenType::Comment => Style::default().fg(Color::DarkGray),
            TokenType::DisabledStatement => Style::default().fg(Color::Red).add_modifier(Modifier::DIM),
            TokenType::Operator => Style::default().fg(Color::Magenta),
            TokenType::Identifier => Style::default().fg(Color::White),
            TokenType::Whitespace => Style::default(),
            TokenType::Punctuation => Style::default().fg(Color::White),
        }
    }
}

const KEYWORDS: &[&str] = &[
    // DDL
    "CREATE", "ALTER", "DROP", "TABLE", "COLUMN", "ADD", "IF", "EXISTS", "NOT", "NULL",
    "DEFAULT", "PRIMARY", "KEY", "REFERENCES", "CONSTRAINT", "UNIQUE", "CHECK", "CASCADE",
    "POLICY", "ON", "FOR", "TO", "USING", "WITH", "TYPE", "SET",
    // Data types
    "INTEGER", "INT", "SMALLINT", "BIGINT", "SERIAL", "BIGSERIAL",
    "NUMERIC", "DECIMAL", "REAL", "DOUBLE", "PRECISION", "FLOAT",
    "VARCHAR", "CHARACTER", "VARYING", "CHAR", "TEXT", "BOOLEAN", "BOOL",
    "DATE", "TIME", "TIMESTAMP", "TIMESTAMPTZ", "INTERVAL", "ZONE", "WITHOUT",
    "JSON", "JSONB", "UUID", "BYTEA", "ARRAY",
];

pub struct SqlHighlighter {
    keywords: Vec<String>,
}

impl SqlHighlighter {
    pub fn new() -> Self {
        Self {
            keywords: KEYWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Tokenizes and styles one line of a script.
    pub fn highlight_line(&self, line: &str) -> Line<'static> {
        let spans: Vec<Span<'static>> = self
            .tokenize(line)
            .into_iter()
            .map(|token| {
                let style = token.style();
                Span::styled(token.text, style)
            })
            .collect();
        Line::from(spans)
    }

    pub fn tokenize(&self, input: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut chars = input.char_indices().peekable();

        while let Some((_, ch)) = chars.next() {
            match ch {
                // Whitespace
                ' ' | '\t' | '\n' | '\r' => {
                    let mut text = String::from(ch);
                    while let Some(&(_, next_ch)) = chars.peek() {
                        if next_ch.is_whitespace() {
                            text.push(next_ch);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    tokens.push(Token::new(TokenType::Whitespace, text));
                }

                // String literals; '' inside one is an escaped quote
                '\'' => {
                    let mut text = String::from(ch);
                    while let Some((_, next_ch)) = chars.next() {
                        text.push(next_ch);
                        if next_ch == '\'' {
                            match chars.peek() {
                                Some(&(_, '\'')) => {
                                    text.push('\'');
                                    chars.next();
                                }
                                _ => break,
                            }
                        }
                    }
                    tokens.push(Token::new(TokenType::String, text));
                }

                // Comments (-- style), runs to end of line
                '-' if chars.peek().map(|(_, c)| *c) == Some('-') => {
                    let mut text = String::from(ch);
                    while let Some(&(_, next_ch)) = chars.peek() {
                        if next_ch == '\n' {
                            break;
                        }
                        text.push(next_ch);
                        chars.next();
                    }
                    let token_type = if is_disabled_statement(&text) {
                        TokenType::DisabledStatement
                    } else {
                        TokenType::Comment
                    };
                    tokens.push(Token::new(token_type, text));
                }

                // Numbers
                '0'..='9' => {
                    let mut text = String::from(ch);
                    let mut has_dot = false;

                    while let Some(&(_, next_ch)) = chars.peek() {
                        if next_ch.is_ascii_digit() {
                            text.push(next_ch);
                            chars.next();
                        } else if next_ch == '.' && !has_dot {
                            has_dot = true;
                            text.push(next_ch);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    tokens.push(Token::new(TokenType::Number, text));
                }

                '=' | '>' | '<' | '!' | '+' | '-' | '*' | '/' | '%' | '|' | '&' | ':' => {
                    let mut text = String::from(ch);
                    // Handle multi-char operators like >=, <=, !=, <>, ::
                    if let Some(&(_, next_ch)) = chars.peek() {
                        let pair = (ch, next_ch);
                        if matches!(pair, ('>', '=') | ('<', '=') | ('!', '=') | ('<', '>') | (':', ':')) {
                            text.push(next_ch);
                            chars.next();
                        }
                    }
                    tokens.push(Token::new(TokenType::Operator, text));
                }

                '(' | ')' | ',' | ';' | '.' => {
                    tokens.push(Token::new(TokenType::Punctuation, String::from(ch)));
                }

                // Identifiers and keywords
                _ if ch.is_alphabetic() || ch == '_' => {
                    let mut text = String::from(ch);

                    while let Some(&(_, next_ch)) = chars.peek() {
                        if next_ch.is_alphanumeric() || next_ch == '_' {
                            text.push(next_ch);
                            chars.next();
                        } else {
                            break;
                        }
                    }

                    let token_type = if self.keywords.contains(&text.to_uppercase()) {
                        TokenType::Keyword
                    } else {
                        TokenType::Identifier
                    };

                    tokens.push(Token::new(token_type, text));
                }

                _ => {
                    tokens.push(Token::new(TokenType::Punctuation, String::from(ch)));
                }
            }
        }

        tokens
    }
}

fn is_disabled_statement(comment: &str) -> bool {
    let body = comment.trim_start_matches('-').trim_start().to_uppercase();
    body.starts_with("DROP ") || body.starts_with("ALTER ")
}

impl Default for SqlHighlighter {
    fn default() -> Self {
        Self::new()
    }
}
