use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Element {
    H,
    He,
    Li,
    Be,
    B,
    C,
    N,
    O,
    F,
    Ne,
    Na,
    Mg,
    Al,
    Si,
    P,
    S,
    Cl,
    Ar,
    K,
    Ca,
    Ti,
    Cr,
    Mn,
    Fe,
    Co,
    Ni,
    Cu,
    Zn,
    Ga,
    Ge,
    As,
    Se,
    Br,
    Kr,
    Rb,
    Sr,
    Ag,
    Cd,
    In,
    Sn,
    Sb,
    Te,
    I,
    Xe,
    Cs,
    Ba,
    Pt,
    Au,
    Hg,
    Tl,
    Pb,
    Bi,
}

use Element::*;

impl Element {
    pub const ALL: [Element; 52] = [
        H, He, Li, Be, B, C, N, O, F, Ne, Na, Mg, Al, Si, P, S, Cl, Ar, K, Ca, Ti, Cr, Mn, Fe,
        Co, Ni, Cu, Zn, Ga, Ge, As, Se, Br, Kr, Rb, Sr, Ag, Cd, In, Sn, Sb, Te, I, Xe, Cs, Ba,
        Pt, Au, Hg, Tl, Pb, Bi,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            H => "H",
            He => "He",
            Li => "Li",
            Be => "Be",
            B => "B",
            C => "C",
            N => "N",
            O => "O",
            F => "F",
            Ne => "Ne",
            Na => "Na",
            Mg => "Mg",
            Al => "Al",
            Si => "Si",
            P => "P",
            S => "S",
            Cl => "Cl",
            Ar => "Ar",
            K => "K",
            Ca => "Ca",
            Ti => "Ti",
            Cr => "Cr",
            Mn => "Mn",
            Fe => "Fe",
            Co => "Co",
            Ni => "Ni",
            Cu => "Cu",
            Zn => "Zn",
            Ga => "Ga",
            Ge => "Ge",
            As => "As",
            Se => "Se",
            Br => "Br",
            Kr => "Kr",
            Rb => "Rb",
            Sr => "Sr",
            Ag => "Ag",
            Cd => "Cd",
            In => "In",
            Sn => "Sn",
            Sb => "Sb",
            Te => "Te",
            I => "I",
            Xe => "Xe",
            Cs => "Cs",
            Ba => "Ba",
            Pt => "Pt",
            Au => "Au",
            Hg => "Hg",
            Tl => "Tl",
            Pb => "Pb",
            Bi => "Bi",
        }
    }

    /// Looks up an element by its capitalized symbol, as written inside brackets.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        SYMBOLS.get(symbol).copied()
    }

    /// Elements that may be written without brackets.
    pub fn from_organic_subset(symbol: &str) -> Option<Self> {
        match symbol {
            "B" => Some(B),
            "C" => Some(C),
            "N" => Some(N),
            "O" => Some(O),
            "P" => Some(P),
            "S" => Some(S),
            "F" => Some(F),
            "Cl" => Some(Cl),
            "Br" => Some(Br),
            "I" => Some(I),
            _ => None,
        }
    }

    /// Looks up an element written in lowercase aromatic form, e.g. `c` or `se`.
    pub fn from_aromatic_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "b" => Some(B),
            "c" => Some(C),
            "n" => Some(N),
            "o" => Some(O),
            "p" => Some(P),
            "s" => Some(S),
            "se" => Some(Se),
            "as" => Some(As),
            "te" => Some(Te),
            _ => None,
        }
    }

    /// Standard valences used to derive implicit hydrogens. Empty for elements
    /// that never receive implicit hydrogens.
    pub fn default_valences(&self) -> &'static [u8] {
        match self {
            H => &[1],
            B => &[3],
            C => &[4],
            N => &[3, 5],
            O => &[2],
            F | Cl | Br | I => &[1],
            Si | Ge => &[4],
            P | As => &[3, 5],
            S | Se | Te => &[2, 4, 6],
            _ => &[],
        }
    }

    pub fn max_valence(&self) -> Option<u8> {
        self.default_valences().last().copied()
    }

    pub fn is_carbon(&self) -> bool {
        *self == C
    }

    /// CPK-like depiction colour.
    pub fn color(&self) -> [u8; 3] {
        match self {
            O => [230, 0, 0],
            N => [0, 0, 230],
            S => [204, 178, 0],
            F | Cl => [0, 170, 0],
            Br => [140, 60, 20],
            I => [150, 30, 220],
            P => [240, 120, 0],
            B => [230, 120, 120],
            Na | K | Li | Cs | Rb => [120, 50, 220],
            Mg | Ca | Ba | Sr | Be => [0, 120, 0],
            Fe | Cu | Co | Ni | Mn | Cr | Ti | Zn => [200, 100, 50],
            _ => [0, 0, 0],
        }
    }
}

impl Display for Element {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.symbol())
    }
}

lazy_static! {
    static ref SYMBOLS: HashMap<&'static str, Element> =
        Element::ALL.iter().map(|e| (e.symbol(), *e)).collect();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_round_trip_through_lookup() {
        for element in Element::ALL {
            assert_eq!(Element::from_symbol(element.symbol()), Some(element));
        }
        assert_eq!(Element::from_symbol("Xx"), None);
        assert_eq!(Element::from_symbol("cl"), None);
    }

    #[test]
    fn organic_subset_excludes_metals() {
        assert_eq!(Element::from_organic_subset("Cl"), Some(Cl));
        assert_eq!(Element::from_organic_subset("Na"), None);
        assert_eq!(Element::from_organic_subset("H"), None);
    }

    #[test]
    fn aromatic_symbols() {
        assert_eq!(Element::from_aromatic_symbol("c"), Some(C));
        assert_eq!(Element::from_aromatic_symbol("se"), Some(Se));
        assert_eq!(Element::from_aromatic_symbol("f"), None);
    }

    #[test]
    fn valences() {
        assert_eq!(C.max_valence(), Some(4));
        assert_eq!(S.default_valences(), &[2, 4, 6]);
        assert_eq!(Fe.max_valence(), None);
    }
}
