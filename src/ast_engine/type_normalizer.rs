//! Canonicalization of C++ type spellings.
//!
//! The canonical form puts cv-qualifiers of the base type first, spells
//! the base name without a leading `::`, elaborated keywords or
//! qualification that repeats the enclosing scope, normalizes template
//! arguments recursively (joined with `", "`), and appends pointer,
//! reference and array suffixes in declaration order:
//! `std::vector<int> const &` becomes `const std::vector<int>&`.

use crate::ast_engine::scope_tree::split_scope;
use crate::frontend::RawType;
use crate::types::{ReferenceKind, TypeDescriptor};

/// Keywords that form builtin types, possibly several in a row.
const BUILTIN_WORDS: &[&str] = &[
    "unsigned", "signed", "short", "long", "int", "char", "double", "float", "bool", "void",
    "wchar_t", "char8_t", "char16_t", "char32_t", "auto", "__int128",
];

/// Start of the `<anonymous@line:col>` names given to unnamed records.
const ANONYMOUS_PREFIX: &str = "anonymous@";

const ELABORATED_KEYWORDS: &[&str] = &["struct", "class", "union", "enum", "typename"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Scope,
    Lt,
    Gt,
    Comma,
    Star,
    Amp,
    AmpAmp,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Ellipsis,
    Other(char),
}

impl Token {
    fn spelling(&self) -> String {
        match self {
            Token::Word(w) => w.clone(),
            Token::Scope => "::".to_string(),
            Token::Lt => "<".to_string(),
            Token::Gt => ">".to_string(),
            Token::Comma => ",".to_string(),
            Token::Star => "*".to_string(),
            Token::Amp => "&".to_string(),
            Token::AmpAmp => "&&".to_string(),
            Token::LBracket => "[".to_string(),
            Token::RBracket => "]".to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::Ellipsis => "...".to_string(),
            Token::Other(c) => c.to_string(),
        }
    }
}

fn tokenize(spelling: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = spelling.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            c if c.is_alphanumeric() || c == '_' => {
                let mut word = c.to_string();
                while let Some(&next) = chars.peek() {
                    if next.is_alphanumeric() || next == '_' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Word(word));
            }
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                tokens.push(Token::Scope);
            }
            '&' if chars.peek() == Some(&'&') => {
                chars.next();
                tokens.push(Token::AmpAmp);
            }
            '.' if chars.peek() == Some(&'.') => {
                while chars.peek() == Some(&'.') {
                    chars.next();
                }
                tokens.push(Token::Ellipsis);
            }
            '<' if chars.clone().take(ANONYMOUS_PREFIX.len()).eq(ANONYMOUS_PREFIX.chars()) => {
                let mut word = String::from('<');
                for next in chars.by_ref() {
                    word.push(next);
                    if next == '>' {
                        break;
                    }
                }
                tokens.push(Token::Word(word));
            }
            '<' => tokens.push(Token::Lt),
            '>' => tokens.push(Token::Gt),
            ',' => tokens.push(Token::Comma),
            '*' => tokens.push(Token::Star),
            '&' => tokens.push(Token::Amp),
            '[' => tokens.push(Token::LBracket),
            ']' => tokens.push(Token::RBracket),
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            other => tokens.push(Token::Other(other)),
        }
    }
    tokens
}

/// Spell tokens back, with a space only between adjacent words.
fn compact_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut previous_word = false;
    for token in tokens {
        let is_word = matches!(token, Token::Word(_));
        if is_word && previous_word {
            out.push(' ');
        }
        out.push_str(&token.spelling());
        if *token == Token::Comma {
            out.push(' ');
        }
        previous_word = is_word;
    }
    out.trim().to_string()
}

/// Normalizes type spellings relative to the scope they appear in.
#[derive(Debug, Clone, Default)]
pub struct TypeNormalizer {
    scope: Vec<String>,
}

impl TypeNormalizer {
    /// Normalizer for the global scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizer for types written inside `scope` (e.g. `geo::Shape`).
    pub fn in_scope(scope: &str) -> Self {
        Self {
            scope: split_scope(scope).into_iter().map(str::to_string).collect(),
        }
    }

    /// Normalize a front-end type, folding in its structured qualifiers.
    pub fn normalize(&self, raw: &RawType) -> TypeDescriptor {
        let mut descriptor = self.normalize_spelling(&raw.spelling);
        let by_value = descriptor.pointer_depth == 0 && !descriptor.is_reference();
        if by_value && raw.is_volatile && !descriptor.is_volatile {
            descriptor.is_volatile = true;
            descriptor.canonical = format!("volatile {}", descriptor.canonical);
        }
        if by_value && raw.is_const && !descriptor.is_const {
            descriptor.is_const = true;
            descriptor.canonical = format!("const {}", descriptor.canonical);
        }
        descriptor
    }

    pub fn normalize_spelling(&self, spelling: &str) -> TypeDescriptor {
        let tokens = tokenize(spelling);
        let mut parser = TypeParser {
            tokens: &tokens,
            pos: 0,
            normalizer: self,
        };
        let mut descriptor = parser.parse_type();
        if parser.pos < tokens.len() {
            let rest = compact_tokens(&tokens[parser.pos..]);
            descriptor.canonical = format!("{} {}", descriptor.canonical, rest).trim().to_string();
        }
        descriptor
    }

    /// Drop leading qualifiers that name an enclosing scope: inside
    /// `geo::shapes`, `geo::shapes::Point`, `geo::Point` and
    /// `shapes::Point` all become `Point`. A spelling made only of
    /// enclosing scopes (`geo::Point` inside class `geo::Point`) keeps
    /// its leaf.
    fn strip_scope(&self, segments: &mut Vec<String>) {
        let shared = (0..self.scope.len())
            .map(|start| {
                segments
                    .iter()
                    .zip(&self.scope[start..])
                    .take_while(|(segment, scope)| segment == scope)
                    .count()
            })
            .max()
            .unwrap_or(0);
        if shared > 0 {
            let keep_from = shared.min(segments.len() - 1);
            segments.drain(..keep_from);
        }
    }
}

struct TypeParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    normalizer: &'a TypeNormalizer,
}

impl<'a> TypeParser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + offset)
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn at_end_of_type(&self) -> bool {
        matches!(self.peek(), None | Some(Token::Comma) | Some(Token::Gt))
    }

    fn parse_type(&mut self) -> TypeDescriptor {
        let mut is_const = false;
        let mut is_volatile = false;

        while let Some(Token::Word(word)) = self.peek() {
            match word.as_str() {
                "const" => is_const = true,
                "volatile" => is_volatile = true,
                w if ELABORATED_KEYWORDS.contains(&w) => {}
                _ => break,
            }
            self.bump();
        }

        let (base_name, template_arguments) = self.parse_base(&mut is_const, &mut is_volatile);

        let mut suffix = String::new();
        let mut pointer_depth = 0;
        let mut reference = ReferenceKind::None;
        loop {
            match self.peek() {
                Some(Token::Word(w)) if w == "const" || w == "volatile" => {
                    if suffix.is_empty() {
                        if w == "const" {
                            is_const = true;
                        } else {
                            is_volatile = true;
                        }
                    } else {
                        suffix.push(' ');
                        suffix.push_str(w);
                    }
                    self.bump();
                }
                Some(Token::Star) => {
                    suffix.push('*');
                    pointer_depth += 1;
                    self.bump();
                }
                Some(Token::Amp) => {
                    suffix.push('&');
                    reference = ReferenceKind::Lvalue;
                    self.bump();
                }
                Some(Token::AmpAmp) => {
                    suffix.push_str("&&");
                    reference = ReferenceKind::Rvalue;
                    self.bump();
                }
                Some(Token::Ellipsis) => {
                    suffix.push_str("...");
                    self.bump();
                }
                Some(Token::LBracket) | Some(Token::LParen) => {
                    let end = self.group_end();
                    suffix.push_str(&compact_tokens(&self.tokens[self.pos..end]));
                    self.pos = end;
                }
                _ => break,
            }
        }

        let mut canonical = String::new();
        if is_const {
            canonical.push_str("const ");
        }
        if is_volatile {
            canonical.push_str("volatile ");
        }
        canonical.push_str(&base_name);
        canonical.push_str(&suffix);

        TypeDescriptor {
            canonical: canonical.trim().to_string(),
            base_name,
            is_const,
            is_volatile,
            pointer_depth,
            reference,
            template_arguments,
        }
    }

    /// Base name with template arguments; cv-words interleaved with builtin
    /// words (`unsigned const int`) are folded into the flags.
    fn parse_base(&mut self, is_const: &mut bool, is_volatile: &mut bool) -> (String, Vec<TypeDescriptor>) {
        if let Some(Token::Word(word)) = self.peek() {
            if BUILTIN_WORDS.contains(&word.as_str()) {
                let mut words = Vec::new();
                while let Some(Token::Word(w)) = self.peek() {
                    match w.as_str() {
                        "const" => *is_const = true,
                        "volatile" => *is_volatile = true,
                        w if BUILTIN_WORDS.contains(&w) => words.push(w.to_string()),
                        _ => break,
                    }
                    self.bump();
                }
                return (words.join(" "), Vec::new());
            }
        }

        if self.peek() == Some(&Token::Scope) {
            self.bump();
        }
        let mut segments = Vec::new();
        let mut last_arguments = Vec::new();
        while let Some(Token::Word(word)) = self.peek() {
            let mut segment = word.clone();
            self.bump();
            last_arguments = Vec::new();
            if self.peek() == Some(&Token::Lt) {
                self.bump();
                last_arguments = self.parse_arguments();
                let spelled: Vec<&str> = last_arguments.iter().map(|a| a.canonical.as_str()).collect();
                segment = format!("{}<{}>", segment, spelled.join(", "));
            }
            segments.push(segment);
            let continues = self.peek() == Some(&Token::Scope)
                && matches!(self.peek_at(1), Some(Token::Word(w)) if !w.is_empty());
            if !continues {
                break;
            }
            self.bump();
        }
        self.normalizer.strip_scope(&mut segments);
        (segments.join("::"), last_arguments)
    }

    /// Arguments after `<`, consuming the closing `>`.
    fn parse_arguments(&mut self) -> Vec<TypeDescriptor> {
        let mut arguments = Vec::new();
        loop {
            match self.peek() {
                None => break,
                Some(Token::Gt) => {
                    self.bump();
                    break;
                }
                Some(Token::Comma) => self.bump(),
                Some(_) => {
                    let end = self.argument_end();
                    arguments.push(self.normalize_argument(self.pos, end));
                    self.pos = end;
                }
            }
        }
        arguments
    }

    /// A template argument is either a type or an expression; expressions
    /// are kept as compact text.
    fn normalize_argument(&self, start: usize, end: usize) -> TypeDescriptor {
        let slice = &self.tokens[start..end];
        let mut parser = TypeParser {
            tokens: slice,
            pos: 0,
            normalizer: self.normalizer,
        };
        let descriptor = parser.parse_type();
        if parser.pos == slice.len() && !descriptor.canonical.is_empty() {
            descriptor
        } else {
            TypeDescriptor::opaque(compact_tokens(slice))
        }
    }

    /// End of the current argument: the next `,` or `>` outside brackets.
    fn argument_end(&self) -> usize {
        let mut depth = 0usize;
        let mut index = self.pos;
        while let Some(token) = self.tokens.get(index) {
            match token {
                Token::Lt | Token::LParen | Token::LBracket => depth += 1,
                Token::RParen | Token::RBracket => depth = depth.saturating_sub(1),
                Token::Gt if depth == 0 => break,
                Token::Gt => depth -= 1,
                Token::Comma if depth == 0 => break,
                _ => {}
            }
            index += 1;
        }
        index
    }

    /// End of the bracketed groups starting at the current token, so that
    /// `(*)(int)` or `[3][4]` are taken as one suffix.
    fn group_end(&self) -> usize {
        let mut index = self.pos;
        while matches!(self.tokens.get(index), Some(Token::LParen) | Some(Token::LBracket)) {
            let mut depth = 0usize;
            while let Some(token) = self.tokens.get(index) {
                match token {
                    Token::LParen | Token::LBracket => depth += 1,
                    Token::RParen | Token::RBracket => depth = depth.saturating_sub(1),
                    _ => {}
                }
                index += 1;
                if depth == 0 {
                    break;
                }
            }
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn canonical(spelling: &str) -> String {
        TypeNormalizer::new().normalize_spelling(spelling).canonical
    }

    #[test]
    fn test_const_moves_to_front() {
        assert_eq!(canonical("std::vector< int > const &"), "const std::vector<int>&");
        assert_eq!(canonical("const   std::vector<int>&"), "const std::vector<int>&");
    }

    #[test]
    fn test_pointer_suffixes_keep_order() {
        let descriptor = TypeNormalizer::new().normalize_spelling("const char * const *");
        assert_eq!(descriptor.canonical, "const char* const*");
        assert_eq!(descriptor.pointer_depth, 2);
        assert!(descriptor.is_const);
    }

    #[test]
    fn test_leading_scope_and_elaborated_keywords_dropped() {
        assert_eq!(canonical("::std::string"), "std::string");
        assert_eq!(canonical("struct Point"), "Point");
        assert_eq!(canonical("typename T::value_type"), "T::value_type");
    }

    #[test]
    fn test_redundant_qualification_stripped() {
        let normalizer = TypeNormalizer::in_scope("geo::shapes");
        let plain = normalizer.normalize_spelling("Point");
        assert_eq!(normalizer.normalize_spelling("geo::shapes::Point"), plain);
        assert_eq!(normalizer.normalize_spelling("geo::Point"), plain);
        assert_eq!(normalizer.normalize_spelling("shapes::Point"), plain);
        assert_eq!(normalizer.normalize_spelling("std::string").canonical, "std::string");
    }

    #[test]
    fn test_fully_enclosing_qualification_keeps_leaf() {
        let in_class = TypeNormalizer::in_scope("geo::Point");
        let out_of_line = in_class.normalize_spelling("const Point&");
        assert_eq!(in_class.normalize_spelling("const geo::Point&"), out_of_line);
        assert_eq!(out_of_line.canonical, "const Point&");
        assert_eq!(out_of_line.base_name, "Point");
        assert_eq!(in_class.normalize_spelling("Point::Inner").canonical, "Inner");
    }

    #[test]
    fn test_anonymous_record_name_is_one_word() {
        let descriptor = TypeNormalizer::in_scope("app").normalize_spelling("const <anonymous@4:1>*");
        assert_eq!(descriptor.canonical, "const <anonymous@4:1>*");
        assert_eq!(descriptor.base_name, "<anonymous@4:1>");
        assert_eq!(descriptor.pointer_depth, 1);
    }

    #[test]
    fn test_nested_template_arguments() {
        let descriptor =
            TypeNormalizer::new().normalize_spelling("std::map<std::string,std::vector<int>>");
        assert_eq!(descriptor.canonical, "std::map<std::string, std::vector<int>>");
        assert_eq!(descriptor.template_arguments.len(), 2);
        assert_eq!(descriptor.template_arguments[1].template_arguments[0].canonical, "int");
    }

    #[test]
    fn test_builtin_words_and_references() {
        assert_eq!(canonical("unsigned   long long"), "unsigned long long");
        assert_eq!(canonical("unsigned const int"), "const unsigned int");

        let rvalue = TypeNormalizer::new().normalize_spelling("T &&");
        assert_eq!(rvalue.canonical, "T&&");
        assert_eq!(rvalue.reference, ReferenceKind::Rvalue);
        assert_eq!(canonical("Args ..."), "Args...");
    }

    #[test]
    fn test_expression_arguments_and_arrays() {
        assert_eq!(canonical("std::array<int, N + 1>"), "std::array<int, N+1>");
        assert_eq!(canonical("int [ 3 ]"), "int[3]");
        assert_eq!(canonical("void (*)(int)"), "void(*)(int)");
    }

    #[test]
    fn test_structured_const_folded_in() {
        let raw = RawType {
            spelling: "int".to_string(),
            is_const: true,
            ..Default::default()
        };
        let descriptor = TypeNormalizer::new().normalize(&raw);
        assert_eq!(descriptor.canonical, "const int");
        assert!(descriptor.is_const);
    }
}
