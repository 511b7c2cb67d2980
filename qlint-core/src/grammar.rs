//! Lexical grammar for q.
//!
//! The grammar is an ordered table of `(TokenKind, Matcher)` pairs. At a
//! given cursor position the lexer tries each matcher in table order and
//! takes the first one that matches, so the order of [`GRAMMAR`] is part of
//! the language definition: temporal literals must be tried before plain
//! numbers, keywords before identifiers, `::` before `:`, and so on.
//!
//! Char literals are lexed in a separate mode ([`STRING_GRAMMAR`]) entered
//! after [`TokenKind::StringBegin`], so that escape sequences come out as
//! their own tokens.

use serde::Serialize;

/// Kind of a token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TokenKind {
    // Comments
    BlockComment,
    LastComment,
    LineComment,

    // Char literals ("...")
    StringBegin,
    StringText,
    StringEscape,
    StringEnd,

    // Literals
    Symbol,
    File,
    Infinity,
    Timestamp,
    Datetime,
    MilliTime,
    NanoTime,
    Date,
    Month,
    Second,
    Minute,
    Binary,
    Byte,
    Number,

    // Words
    Keyword,
    Identifier,

    // Layout
    Whitespace,
    EndOfLine,
    Command,

    // Punctuation and operators
    DoubleColon, // ::
    Iterator,    // ' / \ ': /: \:
    Operator,
    Colon,     // :
    SemiColon, // ;
    LParen,    // (
    RParen,    // )
    LBracket,  // [
    RBracket,  // ]
    LCurly,    // {
    RCurly,    // }
}

impl TokenKind {
    /// Whitespace and comments: skippable at every grammar point.
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace
                | TokenKind::BlockComment
                | TokenKind::LastComment
                | TokenKind::LineComment
        )
    }

    /// Single-token literal values (char literals span several tokens and
    /// are not included).
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::Symbol
                | TokenKind::File
                | TokenKind::Infinity
                | TokenKind::Timestamp
                | TokenKind::Datetime
                | TokenKind::MilliTime
                | TokenKind::NanoTime
                | TokenKind::Date
                | TokenKind::Month
                | TokenKind::Second
                | TokenKind::Minute
                | TokenKind::Binary
                | TokenKind::Byte
                | TokenKind::Number
        )
    }
}

/// Read-only view of the source at the lexer's current position.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'src> {
    source: &'src str,
    position: usize,
}

impl<'src> Cursor<'src> {
    pub fn new(source: &'src str, position: usize) -> Self {
        Cursor { source, position }
    }

    /// Remaining input from the cursor.
    pub fn rest(&self) -> &'src str {
        &self.source[self.position..]
    }

    fn bytes(&self) -> &'src [u8] {
        self.rest().as_bytes()
    }

    /// Byte immediately before the cursor.
    fn prev(&self) -> Option<u8> {
        self.position
            .checked_sub(1)
            .and_then(|at| self.source.as_bytes().get(at).copied())
    }

    fn at_line_start(&self) -> bool {
        matches!(self.prev(), None | Some(b'\n'))
    }

    /// Whether a leading `-` may start a negative literal here. It may not
    /// directly after something that ends an operand, where it is minus.
    fn sign_allowed(&self) -> bool {
        match self.prev() {
            None => true,
            Some(byte) => {
                !(is_ident_char(byte) || matches!(byte, b'.' | b')' | b']' | b'}' | b'"' | b'`'))
            }
        }
    }
}

/// Returns the byte length of the match at the cursor, if any.
pub type Matcher = fn(&Cursor<'_>) -> Option<usize>;

/// Top-level token categories in priority order.
pub const GRAMMAR: &[(TokenKind, Matcher)] = &[
    (TokenKind::BlockComment, block_comment),
    (TokenKind::LastComment, last_comment),
    (TokenKind::LineComment, line_comment),
    (TokenKind::StringBegin, string_quote),
    (TokenKind::Symbol, symbol),
    (TokenKind::File, file),
    (TokenKind::Infinity, infinity),
    (TokenKind::Timestamp, timestamp),
    (TokenKind::Datetime, datetime),
    (TokenKind::MilliTime, milli_time),
    (TokenKind::NanoTime, nano_time),
    (TokenKind::Date, date),
    (TokenKind::Month, month),
    (TokenKind::Second, second),
    (TokenKind::Minute, minute),
    (TokenKind::Binary, binary),
    (TokenKind::Byte, byte_literal),
    (TokenKind::Number, number),
    (TokenKind::Keyword, keyword),
    (TokenKind::Identifier, identifier),
    (TokenKind::Whitespace, whitespace),
    (TokenKind::EndOfLine, end_of_line),
    (TokenKind::Command, command),
    (TokenKind::DoubleColon, double_colon),
    (TokenKind::Iterator, iterator),
    (TokenKind::Operator, operator),
    (TokenKind::Colon, colon),
    (TokenKind::SemiColon, semi_colon),
    (TokenKind::LParen, l_paren),
    (TokenKind::RParen, r_paren),
    (TokenKind::LBracket, l_bracket),
    (TokenKind::RBracket, r_bracket),
    (TokenKind::LCurly, l_curly),
    (TokenKind::RCurly, r_curly),
];

/// Categories inside a char literal, in priority order.
pub const STRING_GRAMMAR: &[(TokenKind, Matcher)] = &[
    (TokenKind::StringEnd, string_quote),
    (TokenKind::StringEscape, string_escape),
    (TokenKind::StringText, string_text),
];

/// Built-in q words. Assigning to any of these is an error.
pub const RESERVED_WORDS: &[&str] = &[
    "abs", "acos", "aj", "aj0", "ajf", "ajf0", "all", "and", "any", "asc", "asin", "asof",
    "atan", "attr", "avg", "avgs", "bin", "binr", "by", "ceiling", "cols", "cor", "cos",
    "count", "cov", "cross", "csv", "cut", "delete", "deltas", "desc", "dev", "differ",
    "distinct", "div", "do", "dsave", "each", "ej", "ema", "enlist", "eval", "except",
    "exec", "exit", "exp", "fby", "fills", "first", "fkeys", "flip", "floor", "from", "get",
    "getenv", "group", "gtime", "hclose", "hcount", "hdel", "hopen", "hsym", "iasc", "idesc",
    "if", "ij", "ijf", "in", "insert", "inter", "inv", "key", "keys", "last", "like", "lj",
    "ljf", "load", "log", "lower", "lsq", "ltime", "ltrim", "mavg", "max", "maxs", "mcount",
    "md5", "mdev", "med", "meta", "min", "mins", "mmax", "mmin", "mmu", "mod", "msum", "neg",
    "next", "not", "null", "or", "over", "parse", "peach", "pj", "prd", "prds", "prev",
    "prior", "rand", "rank", "ratios", "raze", "read0", "read1", "reciprocal", "reval",
    "reverse", "rload", "rotate", "rsave", "rtrim", "save", "scan", "scov", "sdev", "select",
    "set", "setenv", "show", "signum", "sin", "sqrt", "ss", "ssr", "string", "sublist", "sum",
    "sums", "sv", "svar", "system", "tables", "tan", "til", "trim", "type", "uj", "ujf",
    "ungroup", "union", "update", "upper", "upsert", "value", "var", "view", "views", "vs",
    "wavg", "where", "while", "within", "wj", "wj1", "wsum", "xasc", "xbar", "xcol", "xcols",
    "xdesc", "xexp", "xgroup", "xkey", "xlog", "xprev", "xrank",
];

/// Namespaces owned by the q runtime.
pub const SYSTEM_NAMESPACES: &[&str] = &[".q.", ".Q.", ".h.", ".j.", ".o.", ".z."];

pub fn is_reserved_word(word: &str) -> bool {
    RESERVED_WORDS.contains(&word)
}

pub fn is_system_name(name: &str) -> bool {
    SYSTEM_NAMESPACES.iter().any(|ns| name.starts_with(ns))
}

fn is_ident_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

fn is_blank(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t')
}

/// Small forward scanner used by the literal matchers.
struct Scan<'a> {
    bytes: &'a [u8],
    at: usize,
}

impl<'a> Scan<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Scan { bytes, at: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.at).copied()
    }

    fn byte(&mut self, expected: u8) -> Option<()> {
        if self.peek() == Some(expected) {
            self.at += 1;
            Some(())
        } else {
            None
        }
    }

    fn eat(&mut self, expected: u8) -> bool {
        self.byte(expected).is_some()
    }

    fn eat_any(&mut self, set: &[u8]) -> bool {
        match self.peek() {
            Some(byte) if set.contains(&byte) => {
                self.at += 1;
                true
            }
            _ => false,
        }
    }

    /// Exactly `count` digits.
    fn digits(&mut self, count: usize) -> Option<()> {
        let run = self.bytes[self.at..]
            .iter()
            .take(count)
            .take_while(|b| b.is_ascii_digit())
            .count();
        if run == count {
            self.at += count;
            Some(())
        } else {
            None
        }
    }

    /// Zero or more digits, returning how many were consumed.
    fn many_digits(&mut self) -> usize {
        let run = self.bytes[self.at..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        self.at += run;
        run
    }

    /// Optional group: runs `f` and rewinds if it fails.
    fn optional(&mut self, f: impl FnOnce(&mut Self) -> Option<()>) {
        let saved = self.at;
        if f(self).is_none() {
            self.at = saved;
        }
    }

    /// Succeeds when the next byte cannot continue a word.
    fn boundary(&self) -> Option<usize> {
        match self.peek() {
            Some(byte) if is_ident_char(byte) => None,
            _ => Some(self.at),
        }
    }

    fn end(&self) -> Option<usize> {
        (self.at > 0).then_some(self.at)
    }
}

fn single(cursor: &Cursor<'_>, expected: u8) -> Option<usize> {
    (cursor.bytes().first() == Some(&expected)).then_some(1)
}

macro_rules! punctuation {
    ($($name:ident => $byte:literal),* $(,)?) => {
        $(fn $name(cursor: &Cursor<'_>) -> Option<usize> {
            single(cursor, $byte)
        })*
    };
}

punctuation! {
    colon => b':',
    semi_colon => b';',
    l_paren => b'(',
    r_paren => b')',
    l_bracket => b'[',
    r_bracket => b']',
    l_curly => b'{',
    r_curly => b'}',
}

fn line_len(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .position(|&b| b == b'\n')
        .map(|at| if at > 0 && bytes[at - 1] == b'\r' { at - 1 } else { at })
        .unwrap_or(bytes.len())
}

/// Whether `line` holds only `marker` plus trailing blanks.
fn is_marker_line(line: &[u8], marker: u8) -> bool {
    line.first() == Some(&marker) && line[1..].iter().all(|&b| is_blank(b))
}

fn block_comment(cursor: &Cursor<'_>) -> Option<usize> {
    let bytes = cursor.bytes();
    if !cursor.at_line_start() || !is_marker_line(&bytes[..line_len(bytes)], b'/') {
        return None;
    }
    let mut at = line_len(bytes);
    while at < bytes.len() {
        // step over the line terminator
        at += if bytes[at] == b'\r' { 2 } else { 1 };
        let len = line_len(&bytes[at.min(bytes.len())..]);
        if is_marker_line(&bytes[at.min(bytes.len())..at + len], b'\\') {
            return Some(at + len);
        }
        at += len;
    }
    Some(bytes.len())
}

fn last_comment(cursor: &Cursor<'_>) -> Option<usize> {
    let bytes = cursor.bytes();
    (cursor.at_line_start() && is_marker_line(&bytes[..line_len(bytes)], b'\\'))
        .then_some(bytes.len())
}

fn line_comment(cursor: &Cursor<'_>) -> Option<usize> {
    let bytes = cursor.bytes();
    if bytes.first() != Some(&b'/') {
        return None;
    }
    let preceded_by_blank = cursor.prev().is_some_and(is_blank);
    (cursor.at_line_start() || preceded_by_blank).then(|| line_len(bytes))
}

fn command(cursor: &Cursor<'_>) -> Option<usize> {
    let bytes = cursor.bytes();
    match bytes {
        [b'\\', next, ..]
            if cursor.at_line_start() && !matches!(*next, b' ' | b'\t' | b'\r' | b'\n') =>
        {
            Some(line_len(bytes))
        }
        _ => None,
    }
}

fn string_quote(cursor: &Cursor<'_>) -> Option<usize> {
    single(cursor, b'"')
}

fn string_escape(cursor: &Cursor<'_>) -> Option<usize> {
    let rest = cursor.rest();
    let mut at = 0;
    while rest[at..].starts_with('\\') {
        let unit = &rest[at + 1..];
        let bytes = unit.as_bytes();
        let len = if bytes.len() >= 3 && bytes[..3].iter().all(u8::is_ascii_digit) {
            3
        } else {
            match unit.chars().next() {
                Some(ch) => ch.len_utf8(),
                None => break,
            }
        };
        at += 1 + len;
    }
    (at > 0).then_some(at)
}

fn string_text(cursor: &Cursor<'_>) -> Option<usize> {
    let len = cursor
        .bytes()
        .iter()
        .take_while(|&&b| b != b'"' && b != b'\\')
        .count();
    (len > 0).then_some(len)
}

fn symbol(cursor: &Cursor<'_>) -> Option<usize> {
    let bytes = cursor.bytes();
    if bytes.first() != Some(&b'`') || bytes.get(1) == Some(&b':') {
        return None;
    }
    let len = bytes[1..]
        .iter()
        .take_while(|&&b| is_ident_char(b) || b == b'.')
        .count();
    Some(1 + len)
}

fn file(cursor: &Cursor<'_>) -> Option<usize> {
    let bytes = cursor.bytes();
    if !bytes.starts_with(b"`:") {
        return None;
    }
    let len = bytes[2..]
        .iter()
        .take_while(|&&b| is_ident_char(b) || matches!(b, b'.' | b'/' | b'\\' | b':' | b'-'))
        .count();
    Some(2 + len)
}

/// Optional leading minus for numeric literals.
fn signed<'a>(cursor: &Cursor<'a>) -> Scan<'a> {
    let mut scan = Scan::new(cursor.bytes());
    if cursor.sign_allowed() {
        scan.eat(b'-');
    }
    scan
}

fn infinity(cursor: &Cursor<'_>) -> Option<usize> {
    let mut scan = signed(cursor);
    scan.byte(b'0')?;
    if !scan.eat_any(b"wWnN") {
        return None;
    }
    scan.eat_any(b"hijefcpmdznuvtg");
    scan.boundary()
}

fn date_prefix(scan: &mut Scan<'_>) -> Option<()> {
    scan.digits(4)?;
    scan.byte(b'.')?;
    scan.digits(2)?;
    scan.byte(b'.')?;
    scan.digits(2)
}

/// `hh:mm:ss` with an exact digit count per field.
fn clock(scan: &mut Scan<'_>) -> Option<()> {
    scan.digits(2)?;
    scan.byte(b':')?;
    scan.digits(2)?;
    scan.byte(b':')?;
    scan.digits(2)
}

fn fraction(scan: &mut Scan<'_>, max: usize) -> Option<()> {
    scan.byte(b'.')?;
    let run = scan.bytes[scan.at..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    (run <= max).then(|| scan.at += run)
}

fn timestamp(cursor: &Cursor<'_>) -> Option<usize> {
    let mut scan = Scan::new(cursor.bytes());
    date_prefix(&mut scan)?;
    scan.byte(b'D')?;
    scan.optional(|s| {
        s.digits(2)?;
        s.optional(|s| {
            s.byte(b':')?;
            s.digits(2)?;
            s.optional(|s| {
                s.byte(b':')?;
                s.digits(2)?;
                s.optional(|s| fraction(s, 9));
                Some(())
            });
            Some(())
        });
        Some(())
    });
    scan.eat(b'p');
    scan.boundary()
}

fn datetime(cursor: &Cursor<'_>) -> Option<usize> {
    let mut scan = Scan::new(cursor.bytes());
    date_prefix(&mut scan)?;
    scan.byte(b'T')?;
    scan.digits(2)?;
    scan.byte(b':')?;
    scan.digits(2)?;
    scan.optional(|s| {
        s.byte(b':')?;
        s.digits(2)?;
        s.optional(|s| fraction(s, 3));
        Some(())
    });
    scan.eat(b'z');
    scan.boundary()
}

fn milli_time(cursor: &Cursor<'_>) -> Option<usize> {
    let mut scan = Scan::new(cursor.bytes());
    clock(&mut scan)?;
    scan.byte(b'.')?;
    scan.digits(3)?;
    if scan.peek().is_some_and(|b| b.is_ascii_digit()) {
        return None;
    }
    scan.eat(b't');
    scan.boundary()
}

fn nano_time(cursor: &Cursor<'_>) -> Option<usize> {
    let mut scan = Scan::new(cursor.bytes());
    let days = {
        let saved = scan.at;
        if scan.many_digits() > 0 && scan.eat(b'D') {
            true
        } else {
            scan.at = saved;
            false
        }
    };
    if days {
        // `1D`, `1D12`, `1D12:00`, `1D12:00:00.000000001`
        scan.optional(|s| {
            s.digits(2)?;
            s.optional(|s| {
                s.byte(b':')?;
                s.digits(2)?;
                s.optional(|s| {
                    s.byte(b':')?;
                    s.digits(2)?;
                    s.optional(|s| fraction(s, 9));
                    Some(())
                });
                Some(())
            });
            Some(())
        });
    } else {
        clock(&mut scan)?;
        scan.byte(b'.')?;
        scan.digits(9)?;
    }
    scan.eat(b'n');
    scan.boundary()
}

fn date(cursor: &Cursor<'_>) -> Option<usize> {
    let mut scan = Scan::new(cursor.bytes());
    date_prefix(&mut scan)?;
    scan.eat(b'd');
    scan.boundary()
}

fn month(cursor: &Cursor<'_>) -> Option<usize> {
    let mut scan = Scan::new(cursor.bytes());
    scan.digits(4)?;
    scan.byte(b'.')?;
    scan.digits(2)?;
    scan.byte(b'm')?;
    scan.boundary()
}

fn second(cursor: &Cursor<'_>) -> Option<usize> {
    let mut scan = Scan::new(cursor.bytes());
    clock(&mut scan)?;
    scan.eat(b'v');
    scan.boundary()
}

fn minute(cursor: &Cursor<'_>) -> Option<usize> {
    let mut scan = Scan::new(cursor.bytes());
    scan.digits(2)?;
    scan.byte(b':')?;
    scan.digits(2)?;
    if scan.peek().is_some_and(|b| b.is_ascii_digit()) {
        return None;
    }
    scan.eat(b'u');
    scan.boundary()
}

fn binary(cursor: &Cursor<'_>) -> Option<usize> {
    let mut scan = Scan::new(cursor.bytes());
    let run = scan.bytes.iter().take_while(|&&b| b == b'0' || b == b'1').count();
    if run == 0 {
        return None;
    }
    scan.at = run;
    scan.byte(b'b')?;
    scan.boundary()
}

fn byte_literal(cursor: &Cursor<'_>) -> Option<usize> {
    let mut scan = Scan::new(cursor.bytes());
    scan.byte(b'0')?;
    scan.byte(b'x')?;
    let run = scan.bytes[scan.at..]
        .iter()
        .take_while(|b| b.is_ascii_hexdigit())
        .count();
    scan.at += run;
    scan.boundary()
}

fn number(cursor: &Cursor<'_>) -> Option<usize> {
    let mut scan = signed(cursor);
    let whole = scan.many_digits();
    if whole == 1 && scan.at == 1 && scan.peek() == Some(b':') && is_io_operator(cursor) {
        return None;
    }
    if scan.peek() == Some(b'.') && scan.bytes.get(scan.at + 1).is_some_and(u8::is_ascii_digit) {
        scan.at += 1;
        scan.many_digits();
    } else if whole > 0 && scan.peek() == Some(b'.') {
        scan.at += 1;
    }
    if whole == 0 && scan.bytes[..scan.at].iter().all(|&b| !b.is_ascii_digit()) {
        return None;
    }
    scan.optional(|s| {
        s.byte(b'e')?;
        s.eat_any(b"+-");
        (s.many_digits() > 0).then_some(())
    });
    scan.eat_any(b"hijef");
    scan.end()
}

fn keyword(cursor: &Cursor<'_>) -> Option<usize> {
    let bytes = cursor.bytes();
    if !bytes.first().is_some_and(u8::is_ascii_alphabetic) || cursor.prev() == Some(b'.') {
        return None;
    }
    let len = bytes.iter().take_while(|&&b| is_ident_char(b)).count();
    let word = &cursor.rest()[..len];
    (is_reserved_word(word) && bytes.get(len) != Some(&b'.')).then_some(len)
}

fn identifier(cursor: &Cursor<'_>) -> Option<usize> {
    let bytes = cursor.bytes();
    let starts = match bytes {
        [first, ..] if first.is_ascii_alphabetic() => true,
        [b'.', second, ..] => second.is_ascii_alphabetic(),
        _ => false,
    };
    if !starts {
        return None;
    }
    let mut at = 1;
    while let Some(&byte) = bytes.get(at) {
        let continues = is_ident_char(byte)
            || (byte == b'.' && bytes.get(at + 1).is_some_and(|&b| is_ident_char(b)));
        if !continues {
            break;
        }
        at += 1;
    }
    Some(at)
}

fn whitespace(cursor: &Cursor<'_>) -> Option<usize> {
    let bytes = cursor.bytes();
    let mut at = 0;
    while let Some(&byte) = bytes.get(at) {
        let lone_return = byte == b'\r' && bytes.get(at + 1) != Some(&b'\n');
        if !(is_blank(byte) || lone_return) {
            break;
        }
        at += 1;
    }
    (at > 0).then_some(at)
}

fn end_of_line(cursor: &Cursor<'_>) -> Option<usize> {
    match cursor.bytes() {
        [b'\n', ..] => Some(1),
        [b'\r', b'\n', ..] => Some(2),
        _ => None,
    }
}

fn double_colon(cursor: &Cursor<'_>) -> Option<usize> {
    cursor.bytes().starts_with(b"::").then_some(2)
}

fn iterator(cursor: &Cursor<'_>) -> Option<usize> {
    match cursor.bytes() {
        [b'\'' | b'/' | b'\\', b':', ..] => Some(2),
        [b'\'' | b'/' | b'\\', ..] => Some(1),
        _ => None,
    }
}

/// `0:`, `1:` and `2:` are file and IPC primitives, not assignments.
fn is_io_operator(cursor: &Cursor<'_>) -> bool {
    let operand_before = cursor
        .prev()
        .is_some_and(|b| is_ident_char(b) || b == b'.');
    if operand_before {
        return false;
    }
    match cursor.bytes() {
        [b'0'..=b'2', b':'] => true,
        [b'0'..=b'2', b':', next, ..] => *next != b':',
        _ => false,
    }
}

fn operator(cursor: &Cursor<'_>) -> Option<usize> {
    if is_io_operator(cursor) {
        return Some(2);
    }
    match cursor.bytes() {
        [b'<', b'=' | b'>', ..] | [b'>', b'=', ..] => Some(2),
        [first, ..] if b"=<>+-*%!@#$&|^~,._?".contains(first) => Some(1),
        _ => None,
    }
}
