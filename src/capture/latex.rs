//! A small LaTeX math to MathML converter.
//!
//! Covers the notation that shows up in prose: identifiers, numbers,
//! operators, scripts, fractions, roots, `\left…\right` fences, accents,
//! font switches, Greek letters and the common symbol set. Anything else is
//! a [`LatexError`] so the caller can keep the source text.

use crate::dom::{Document, ElementData, NodeId};
use thiserror::Error;

pub const MATHML_NAMESPACE: &str = "http://www.w3.org/1998/Math/MathML";

/// Deepest group, argument or fence nesting accepted before giving up
pub const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LatexError {
    #[error("empty expression")]
    Empty,

    #[error("unknown command \\{0}")]
    UnknownCommand(String),

    #[error("unbalanced braces")]
    UnbalancedBraces,

    #[error("\\left without matching \\right")]
    UnmatchedDelimiter,

    #[error("missing argument for {0}")]
    MissingArgument(String),

    #[error("double {0}script")]
    DoubleScript(&'static str),

    #[error("unexpected '{0}'")]
    Unexpected(char),

    #[error("nested deeper than {MAX_NESTING} levels")]
    TooDeep,
}

/// Parsed math expression
#[derive(Debug, Clone, PartialEq)]
pub enum MathNode {
    Ident(String),
    Number(String),
    Operator(String),
    Text(String),
    Space(&'static str),
    Row(Vec<MathNode>),
    Sup(Box<MathNode>, Box<MathNode>),
    Sub(Box<MathNode>, Box<MathNode>),
    /// base, subscript, superscript
    SubSup(Box<MathNode>, Box<MathNode>, Box<MathNode>),
    Frac(Box<MathNode>, Box<MathNode>),
    Sqrt(Box<MathNode>),
    /// base, index
    Root(Box<MathNode>, Box<MathNode>),
    Styled {
        variant: &'static str,
        body: Box<MathNode>,
    },
    Fenced {
        open: String,
        close: String,
        body: Box<MathNode>,
    },
    Accent {
        base: Box<MathNode>,
        mark: &'static str,
    },
}

const GREEK: &[(&str, char)] = &[
    ("alpha", 'α'), ("beta", 'β'), ("gamma", 'γ'), ("delta", 'δ'),
    ("epsilon", 'ϵ'), ("varepsilon", 'ε'), ("zeta", 'ζ'), ("eta", 'η'),
    ("theta", 'θ'), ("vartheta", 'ϑ'), ("iota", 'ι'), ("kappa", 'κ'),
    ("lambda", 'λ'), ("mu", 'μ'), ("nu", 'ν'), ("xi", 'ξ'),
    ("pi", 'π'), ("varpi", 'ϖ'), ("rho", 'ρ'), ("varrho", 'ϱ'),
    ("sigma", 'σ'), ("varsigma", 'ς'), ("tau", 'τ'), ("upsilon", 'υ'),
    ("phi", 'ϕ'), ("varphi", 'φ'), ("chi", 'χ'), ("psi", 'ψ'),
    ("omega", 'ω'), ("Gamma", 'Γ'), ("Delta", 'Δ'), ("Theta", 'Θ'),
    ("Lambda", 'Λ'), ("Xi", 'Ξ'), ("Pi", 'Π'), ("Sigma", 'Σ'),
    ("Upsilon", 'Υ'), ("Phi", 'Φ'), ("Psi", 'Ψ'), ("Omega", 'Ω'),
];

const OPERATORS: &[(&str, &str)] = &[
    ("times", "×"), ("cdot", "⋅"), ("div", "÷"), ("pm", "±"), ("mp", "∓"),
    ("ast", "∗"), ("star", "⋆"), ("circ", "∘"), ("bullet", "∙"),
    ("leq", "≤"), ("le", "≤"), ("geq", "≥"), ("ge", "≥"), ("neq", "≠"), ("ne", "≠"),
    ("ll", "≪"), ("gg", "≫"), ("approx", "≈"), ("equiv", "≡"), ("sim", "∼"),
    ("simeq", "≃"), ("cong", "≅"), ("propto", "∝"),
    ("sum", "∑"), ("prod", "∏"), ("coprod", "∐"), ("int", "∫"), ("iint", "∬"),
    ("oint", "∮"), ("bigcup", "⋃"), ("bigcap", "⋂"),
    ("cup", "∪"), ("cap", "∩"), ("setminus", "∖"), ("in", "∈"), ("notin", "∉"),
    ("ni", "∋"), ("subset", "⊂"), ("subseteq", "⊆"), ("supset", "⊃"), ("supseteq", "⊇"),
    ("forall", "∀"), ("exists", "∃"), ("neg", "¬"), ("lnot", "¬"),
    ("land", "∧"), ("wedge", "∧"), ("lor", "∨"), ("vee", "∨"),
    ("oplus", "⊕"), ("ominus", "⊖"), ("otimes", "⊗"), ("odot", "⊙"),
    ("perp", "⊥"), ("parallel", "∥"), ("mid", "∣"), ("angle", "∠"),
    ("to", "→"), ("rightarrow", "→"), ("leftarrow", "←"), ("gets", "←"),
    ("leftrightarrow", "↔"), ("Rightarrow", "⇒"), ("Leftarrow", "⇐"),
    ("Leftrightarrow", "⇔"), ("implies", "⟹"), ("iff", "⟺"), ("mapsto", "↦"),
    ("uparrow", "↑"), ("downarrow", "↓"),
    ("ldots", "…"), ("dots", "…"), ("cdots", "⋯"), ("vdots", "⋮"), ("ddots", "⋱"),
    ("langle", "⟨"), ("rangle", "⟩"), ("lfloor", "⌊"), ("rfloor", "⌋"),
    ("lceil", "⌈"), ("rceil", "⌉"), ("vert", "|"), ("Vert", "‖"),
    ("prime", "′"),
];

const SYMBOLS: &[(&str, &str)] = &[
    ("infty", "∞"), ("partial", "∂"), ("nabla", "∇"), ("emptyset", "∅"),
    ("varnothing", "∅"), ("hbar", "ℏ"), ("ell", "ℓ"), ("aleph", "ℵ"),
    ("Re", "ℜ"), ("Im", "ℑ"), ("degree", "°"),
];

const FUNCTIONS: &[&str] = &[
    "sin", "cos", "tan", "cot", "sec", "csc", "arcsin", "arccos", "arctan",
    "sinh", "cosh", "tanh", "coth", "log", "ln", "lg", "exp", "lim", "liminf",
    "limsup", "max", "min", "sup", "inf", "det", "arg", "deg", "dim", "gcd",
    "hom", "ker", "Pr",
];

const SPACES: &[(&str, &str)] = &[
    (",", "0.167em"), (":", "0.222em"), (">", "0.222em"), (";", "0.278em"),
    ("!", "-0.167em"), (" ", "0.25em"), ("quad", "1em"), ("qquad", "2em"),
];

const VARIANTS: &[(&str, &str)] = &[
    ("mathrm", "normal"), ("mathbf", "bold"), ("boldsymbol", "bold-italic"),
    ("mathit", "italic"), ("mathbb", "double-struck"), ("mathcal", "script"),
    ("mathscr", "script"), ("mathfrak", "fraktur"), ("mathsf", "sans-serif"),
    ("mathtt", "monospace"),
];

const ACCENTS: &[(&str, &str)] = &[
    ("hat", "^"), ("widehat", "^"), ("bar", "¯"), ("overline", "¯"),
    ("vec", "→"), ("overrightarrow", "→"), ("dot", "˙"), ("ddot", "¨"),
    ("tilde", "~"), ("widetilde", "~"),
];

/// Commands that only affect layout and render as nothing
const IGNORED: &[&str] = &["displaystyle", "textstyle", "limits", "nolimits", "big", "Big", "bigg", "Bigg"];

fn lookup<'a>(table: &[(&str, &'a str)], name: &str) -> Option<&'a str> {
    table.iter().find(|(key, _)| *key == name).map(|(_, value)| *value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    End,
    Brace,
    Bracket,
    Right,
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    /// Whether the input at the cursor is `\name` (and not a longer command)
    fn at_command(&self, name: &str) -> bool {
        if self.peek() != Some('\\') {
            return false;
        }
        let len = name.chars().count();
        name.chars().enumerate().all(|(i, c)| self.peek_at(i + 1) == Some(c))
            && !self.peek_at(len + 1).is_some_and(|c| c.is_ascii_alphabetic())
    }

    fn parse_sequence(&mut self, stop: Stop) -> Result<Vec<MathNode>, LatexError> {
        let mut nodes = Vec::new();
        loop {
            self.skip_whitespace();
            let Some(c) = self.peek() else {
                return match stop {
                    Stop::End => Ok(nodes),
                    Stop::Brace | Stop::Bracket => Err(LatexError::UnbalancedBraces),
                    Stop::Right => Err(LatexError::UnmatchedDelimiter),
                };
            };

            match c {
                '}' if stop == Stop::Brace => {
                    self.pos += 1;
                    return Ok(nodes);
                }
                '}' => return Err(LatexError::UnbalancedBraces),
                ']' if stop == Stop::Bracket => {
                    self.pos += 1;
                    return Ok(nodes);
                }
                '^' | '_' => {
                    self.pos += 1;
                    let script = self.parse_argument(if c == '^' { "^" } else { "_" })?;
                    let base = nodes.pop().unwrap_or(MathNode::Row(Vec::new()));
                    nodes.push(attach_script(base, c, script)?);
                }
                '\\' if self.at_command("right") => {
                    return if stop == Stop::Right {
                        Ok(nodes)
                    } else {
                        Err(LatexError::UnmatchedDelimiter)
                    };
                }
                _ => nodes.push(self.parse_atom()?),
            }
        }
    }

    /// Every recursive descent passes through here
    fn parse_atom(&mut self) -> Result<MathNode, LatexError> {
        if self.depth >= MAX_NESTING {
            return Err(LatexError::TooDeep);
        }
        self.depth += 1;
        let atom = self.parse_atom_inner();
        self.depth -= 1;
        atom
    }

    fn parse_atom_inner(&mut self) -> Result<MathNode, LatexError> {
        let Some(c) = self.peek() else {
            return Err(LatexError::Empty);
        };

        if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|n| n.is_ascii_digit())) {
            let start = self.pos;
            while self.peek().is_some_and(|d| d.is_ascii_digit() || d == '.') {
                self.pos += 1;
            }
            return Ok(MathNode::Number(self.chars[start..self.pos].iter().collect()));
        }

        match c {
            '{' => {
                self.pos += 1;
                Ok(row(self.parse_sequence(Stop::Brace)?))
            }
            '\\' => self.parse_command(),
            '&' | '#' | '%' | '$' => Err(LatexError::Unexpected(c)),
            _ => {
                self.pos += 1;
                Ok(match c {
                    c if c.is_alphabetic() => MathNode::Ident(c.to_string()),
                    '-' => MathNode::Operator("−".to_string()),
                    '\'' => MathNode::Operator("′".to_string()),
                    '~' => MathNode::Space("0.25em"),
                    c => MathNode::Operator(c.to_string()),
                })
            }
        }
    }

    /// A script or command argument: a group, a command, or one character
    fn parse_argument(&mut self, owner: &str) -> Result<MathNode, LatexError> {
        self.skip_whitespace();
        match self.peek() {
            None | Some('}') | Some(']') => Err(LatexError::MissingArgument(owner.to_string())),
            Some(c) if c.is_ascii_digit() => {
                self.pos += 1;
                Ok(MathNode::Number(c.to_string()))
            }
            Some(_) => self.parse_atom(),
        }
    }

    fn read_command_name(&mut self) -> Result<String, LatexError> {
        // Cursor is on the backslash
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        if self.pos == start {
            match self.peek() {
                Some(_) => self.pos += 1,
                None => return Err(LatexError::Unexpected('\\')),
            }
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    /// Raw text of a `{…}` group, braces balanced
    fn read_raw_group(&mut self, owner: &str) -> Result<String, LatexError> {
        self.skip_whitespace();
        if self.peek() != Some('{') {
            return Err(LatexError::MissingArgument(format!("\\{}", owner)));
        }
        self.pos += 1;

        let mut depth = 1;
        let mut text = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(text);
                    }
                }
                _ => {}
            }
            text.push(c);
        }
        Err(LatexError::UnbalancedBraces)
    }

    fn read_delimiter(&mut self) -> Result<String, LatexError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(LatexError::MissingArgument("\\left".to_string())),
            Some('.') => {
                self.pos += 1;
                Ok(String::new())
            }
            Some('\\') => {
                let name = self.read_command_name()?;
                match name.as_str() {
                    "{" | "}" => Ok(name),
                    "|" => Ok("‖".to_string()),
                    "langle" | "rangle" | "lfloor" | "rfloor" | "lceil" | "rceil" | "vert" | "Vert" => {
                        Ok(lookup(OPERATORS, &name).unwrap_or_default().to_string())
                    }
                    _ => Err(LatexError::UnknownCommand(name)),
                }
            }
            Some(c @ ('(' | ')' | '[' | ']' | '|' | '/' | '<' | '>')) => {
                self.pos += 1;
                Ok(match c {
                    '<' => "⟨".to_string(),
                    '>' => "⟩".to_string(),
                    c => c.to_string(),
                })
            }
            Some(c) => Err(LatexError::Unexpected(c)),
        }
    }

    fn parse_command(&mut self) -> Result<MathNode, LatexError> {
        let name = self.read_command_name()?;
        let name = name.as_str();

        if let Some(width) = lookup(SPACES, name) {
            return Ok(MathNode::Space(width));
        }
        if let Some(variant) = lookup(VARIANTS, name) {
            let body = self.parse_argument(name)?;
            return Ok(MathNode::Styled {
                variant,
                body: Box::new(body),
            });
        }
        if let Some(mark) = lookup(ACCENTS, name) {
            let base = self.parse_argument(name)?;
            return Ok(MathNode::Accent {
                base: Box::new(base),
                mark,
            });
        }
        if let Some((_, letter)) = GREEK.iter().find(|(key, _)| *key == name) {
            return Ok(MathNode::Ident(letter.to_string()));
        }
        if let Some(op) = lookup(OPERATORS, name) {
            return Ok(MathNode::Operator(op.to_string()));
        }
        if let Some(symbol) = lookup(SYMBOLS, name) {
            return Ok(MathNode::Ident(symbol.to_string()));
        }
        if FUNCTIONS.contains(&name) {
            return Ok(MathNode::Ident(name.to_string()));
        }
        if IGNORED.contains(&name) {
            return Ok(MathNode::Row(Vec::new()));
        }

        match name {
            "{" | "}" | "|" | "%" | "$" | "&" | "#" | "_" => Ok(MathNode::Operator(
                if name == "|" { "‖".to_string() } else { name.to_string() },
            )),
            "frac" | "dfrac" | "tfrac" | "cfrac" => {
                let numerator = self.parse_argument(name)?;
                let denominator = self.parse_argument(name)?;
                Ok(MathNode::Frac(Box::new(numerator), Box::new(denominator)))
            }
            "sqrt" => {
                self.skip_whitespace();
                if self.peek() == Some('[') {
                    self.pos += 1;
                    let index = row(self.parse_sequence(Stop::Bracket)?);
                    let base = self.parse_argument(name)?;
                    Ok(MathNode::Root(Box::new(base), Box::new(index)))
                } else {
                    Ok(MathNode::Sqrt(Box::new(self.parse_argument(name)?)))
                }
            }
            "text" | "textrm" | "textnormal" | "mbox" => Ok(MathNode::Text(self.read_raw_group(name)?)),
            "textbf" => Ok(MathNode::Styled {
                variant: "bold",
                body: Box::new(MathNode::Text(self.read_raw_group(name)?)),
            }),
            "textit" => Ok(MathNode::Styled {
                variant: "italic",
                body: Box::new(MathNode::Text(self.read_raw_group(name)?)),
            }),
            "operatorname" => Ok(MathNode::Ident(self.read_raw_group(name)?.trim().to_string())),
            "left" => {
                let open = self.read_delimiter()?;
                let body = row(self.parse_sequence(Stop::Right)?);
                // parse_sequence stops on `\right` without consuming it
                self.read_command_name()?;
                let close = self.read_delimiter()?;
                Ok(MathNode::Fenced {
                    open,
                    close,
                    body: Box::new(body),
                })
            }
            "right" => Err(LatexError::UnmatchedDelimiter),
            _ => Err(LatexError::UnknownCommand(name.to_string())),
        }
    }
}

fn row(mut nodes: Vec<MathNode>) -> MathNode {
    if nodes.len() == 1 {
        nodes.remove(0)
    } else {
        MathNode::Row(nodes)
    }
}

fn attach_script(base: MathNode, kind: char, script: MathNode) -> Result<MathNode, LatexError> {
    let script = Box::new(script);
    match (kind, base) {
        ('^', MathNode::Sub(base, sub)) => Ok(MathNode::SubSup(base, sub, script)),
        ('_', MathNode::Sup(base, sup)) => Ok(MathNode::SubSup(base, script, sup)),
        ('^', MathNode::Sup(..) | MathNode::SubSup(..)) => Err(LatexError::DoubleScript("super")),
        ('_', MathNode::Sub(..) | MathNode::SubSup(..)) => Err(LatexError::DoubleScript("sub")),
        ('^', base) => Ok(MathNode::Sup(Box::new(base), script)),
        (_, base) => Ok(MathNode::Sub(Box::new(base), script)),
    }
}

/// Parse a LaTeX math expression
pub fn parse(source: &str) -> Result<Vec<MathNode>, LatexError> {
    let nodes = Parser::new(source).parse_sequence(Stop::End)?;
    if nodes.is_empty() {
        return Err(LatexError::Empty);
    }
    Ok(nodes)
}

/// Convert a LaTeX expression to a detached `<math>` element in `doc`.
///
/// Nothing is added to the document when parsing fails.
pub fn render_mathml(doc: &mut Document, source: &str, display: bool) -> Result<NodeId, LatexError> {
    let nodes = parse(source)?;

    let math = doc.create_element_with(
        ElementData::new("math")
            .with_attribute("xmlns", MATHML_NAMESPACE)
            .with_attribute("display", if display { "block" } else { "inline" }),
    );
    for node in &nodes {
        let child = build(doc, node);
        doc.append(math, child);
    }
    Ok(math)
}

fn leaf(doc: &mut Document, tag: &str, text: &str) -> NodeId {
    let element = doc.create_element(tag);
    let text = doc.create_text(text);
    doc.append(element, text);
    element
}

fn parent(doc: &mut Document, tag: &str, children: &[&MathNode]) -> NodeId {
    let element = doc.create_element(tag);
    for child in children {
        let built = build(doc, child);
        doc.append(element, built);
    }
    element
}

fn append_fence(doc: &mut Document, row: NodeId, fence: &str) {
    if fence.is_empty() {
        return;
    }
    let mo = leaf(doc, "mo", fence);
    doc.set_attr(mo, "fence", "true");
    doc.append(row, mo);
}

fn build(doc: &mut Document, node: &MathNode) -> NodeId {
    match node {
        MathNode::Ident(name) => leaf(doc, "mi", name),
        MathNode::Number(value) => leaf(doc, "mn", value),
        MathNode::Operator(op) => leaf(doc, "mo", op),
        MathNode::Text(text) => leaf(doc, "mtext", text),
        MathNode::Space(width) => {
            doc.create_element_with(ElementData::new("mspace").with_attribute("width", *width))
        }
        MathNode::Row(children) => {
            let children: Vec<&MathNode> = children.iter().collect();
            parent(doc, "mrow", &children)
        }
        MathNode::Sup(base, sup) => parent(doc, "msup", &[&**base, &**sup]),
        MathNode::Sub(base, sub) => parent(doc, "msub", &[&**base, &**sub]),
        MathNode::SubSup(base, sub, sup) => parent(doc, "msubsup", &[&**base, &**sub, &**sup]),
        MathNode::Frac(num, den) => parent(doc, "mfrac", &[&**num, &**den]),
        MathNode::Sqrt(base) => parent(doc, "msqrt", &[&**base]),
        MathNode::Root(base, index) => parent(doc, "mroot", &[&**base, &**index]),
        MathNode::Styled { variant, body } => {
            let style = doc.create_element_with(ElementData::new("mstyle").with_attribute("mathvariant", *variant));
            let body = build(doc, body);
            doc.append(style, body);
            style
        }
        MathNode::Fenced { open, close, body } => {
            let mrow = doc.create_element("mrow");
            append_fence(doc, mrow, open);
            let body = build(doc, body);
            doc.append(mrow, body);
            append_fence(doc, mrow, close);
            mrow
        }
        MathNode::Accent { base, mark } => {
            let over = doc.create_element_with(ElementData::new("mover").with_attribute("accent", "true"));
            let base = build(doc, base);
            doc.append(over, base);
            let mark = leaf(doc, "mo", mark);
            doc.append(over, mark);
            over
        }
    }
}
