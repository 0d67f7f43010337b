//! Keypad catalog
//!
//! Every expression element the user can press is one `Key`. The catalog
//! carries the classification predicates the buffer and evaluator dispatch
//! on, the wire id used by the codec, and the display/accessibility strings.

/// One keypad entry. Discriminants are the stable wire ids written by the
/// codec; never reuse or renumber them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Key {
    // Constant material
    D0 = 0,
    D1 = 1,
    D2 = 2,
    D3 = 3,
    D4 = 4,
    D5 = 5,
    D6 = 6,
    D7 = 7,
    D8 = 8,
    D9 = 9,
    Point = 10,

    // Binary operators
    Add = 20,
    Sub = 21,
    Mul = 22,
    Div = 23,
    Pow = 24,

    // Prefix and postfix operators
    Sqrt = 30,
    Fact = 31,
    Square = 32,
    Percent = 33,

    // Grouping
    LParen = 40,
    RParen = 41,

    // Named functions
    Sin = 50,
    Cos = 51,
    Tan = 52,
    Asin = 53,
    Acos = 54,
    Atan = 55,
    Ln = 56,
    Log = 57,
    Exp = 58,

    // Constants
    Pi = 70,
    E = 71,
}

impl Key {
    /// Wire id for the codec.
    pub fn id(self) -> i32 {
        self as i32
    }

    /// Inverse of [`Key::id`]; `None` for ids no catalog entry carries.
    pub fn from_id(id: i32) -> Option<Self> {
        use Key::*;
        Some(match id {
            0 => D0,
            1 => D1,
            2 => D2,
            3 => D3,
            4 => D4,
            5 => D5,
            6 => D6,
            7 => D7,
            8 => D8,
            9 => D9,
            10 => Point,
            20 => Add,
            21 => Sub,
            22 => Mul,
            23 => Div,
            24 => Pow,
            30 => Sqrt,
            31 => Fact,
            32 => Square,
            33 => Percent,
            40 => LParen,
            41 => RParen,
            50 => Sin,
            51 => Cos,
            52 => Tan,
            53 => Asin,
            54 => Acos,
            55 => Atan,
            56 => Ln,
            57 => Log,
            58 => Exp,
            70 => Pi,
            71 => E,
            _ => return None,
        })
    }

    /// Digit value, for the ten digit keys.
    pub fn digit(self) -> Option<u32> {
        let id = self.id();
        (0..=9).contains(&id).then_some(id as u32)
    }

    /// Operators that take a left and a right operand.
    pub fn is_binary(self) -> bool {
        matches!(self, Key::Add | Key::Sub | Key::Mul | Key::Div | Key::Pow)
    }

    /// Operators admitted before their operand. Minus doubles as the
    /// unary-minus prefix.
    pub fn is_prefix(self) -> bool {
        matches!(self, Key::Sqrt | Key::Sub)
    }

    /// Addition or subtraction.
    pub fn is_additive(self) -> bool {
        matches!(self, Key::Add | Key::Sub)
    }

    /// Named functions, entered as `f(`.
    pub fn is_function(self) -> bool {
        matches!(
            self,
            Key::Sin
                | Key::Cos
                | Key::Tan
                | Key::Asin
                | Key::Acos
                | Key::Atan
                | Key::Ln
                | Key::Log
                | Key::Exp
        )
    }

    /// Trigonometric functions, direct and inverse. Drives the degree/radian
    /// mode indicator.
    pub fn is_trig(self) -> bool {
        matches!(
            self,
            Key::Sin | Key::Cos | Key::Tan | Key::Asin | Key::Acos | Key::Atan
        )
    }

    /// Display string, as rendered in the formula line.
    pub fn label(self) -> &'static str {
        match self {
            Key::D0 => "0",
            Key::D1 => "1",
            Key::D2 => "2",
            Key::D3 => "3",
            Key::D4 => "4",
            Key::D5 => "5",
            Key::D6 => "6",
            Key::D7 => "7",
            Key::D8 => "8",
            Key::D9 => "9",
            Key::Point => ".",
            Key::Add => "+",
            Key::Sub => "−",
            Key::Mul => "×",
            Key::Div => "÷",
            Key::Pow => "^",
            Key::Sqrt => "√",
            Key::Fact => "!",
            Key::Square => "²",
            Key::Percent => "%",
            Key::LParen => "(",
            Key::RParen => ")",
            Key::Sin => "sin",
            Key::Cos => "cos",
            Key::Tan => "tan",
            Key::Asin => "sin⁻¹",
            Key::Acos => "cos⁻¹",
            Key::Atan => "tan⁻¹",
            Key::Ln => "ln",
            Key::Log => "log",
            Key::Exp => "exp",
            Key::Pi => "π",
            Key::E => "e",
        }
    }

    /// Accessibility description, read aloud by screen readers.
    pub fn spoken(self) -> &'static str {
        match self {
            Key::D0 => "0",
            Key::D1 => "1",
            Key::D2 => "2",
            Key::D3 => "3",
            Key::D4 => "4",
            Key::D5 => "5",
            Key::D6 => "6",
            Key::D7 => "7",
            Key::D8 => "8",
            Key::D9 => "9",
            Key::Point => "point",
            Key::Add => "plus",
            Key::Sub => "minus",
            Key::Mul => "times",
            Key::Div => "divided by",
            Key::Pow => "to the power of",
            Key::Sqrt => "square root of",
            Key::Fact => "factorial",
            Key::Square => "squared",
            Key::Percent => "percent",
            Key::LParen => "open parenthesis",
            Key::RParen => "close parenthesis",
            Key::Sin => "sine",
            Key::Cos => "cosine",
            Key::Tan => "tangent",
            Key::Asin => "arc sine",
            Key::Acos => "arc cosine",
            Key::Atan => "arc tangent",
            Key::Ln => "natural logarithm",
            Key::Log => "logarithm",
            Key::Exp => "exponential",
            Key::Pi => "pi",
            Key::E => "e",
        }
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
