use std::{
    fmt::{Display, Write},
    str::FromStr,
};

use regex::Regex;
use serde::{de::Visitor, Deserialize, Serialize};

/// Set of residues on which a bracketed mass is recognized as a modification.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum ResidueAlphabet {
    /// Every ASCII letter, upper or lower case
    #[default]
    All,
    /// Asparagine only (N-linked glycosylation)
    NLinked,
    /// Serine and threonine (O-linked glycosylation)
    OLinked,
    /// N, S and T
    Glycosylation,
    /// An explicit set of residue letters
    Custom(Vec<u8>),
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InvalidAlphabet {
    Empty,
    InvalidResidue(char),
}

impl Display for InvalidAlphabet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidAlphabet::Empty => write!(f, "residue alphabet is empty"),
            InvalidAlphabet::InvalidResidue(c) => {
                write!(f, "unrecognized residue in alphabet ({})", c)
            }
        }
    }
}

impl std::error::Error for InvalidAlphabet {}

impl ResidueAlphabet {
    /// Residue letters, as they appear inside the regex character class
    fn sites(&self) -> String {
        match self {
            ResidueAlphabet::All => "A-Za-z".into(),
            ResidueAlphabet::NLinked => "N".into(),
            ResidueAlphabet::OLinked => "ST".into(),
            ResidueAlphabet::Glycosylation => "NST".into(),
            ResidueAlphabet::Custom(residues) => residues.iter().map(|&r| r as char).collect(),
        }
    }
}

impl FromStr for ResidueAlphabet {
    type Err = InvalidAlphabet;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => return Ok(ResidueAlphabet::All),
            "n-linked" => return Ok(ResidueAlphabet::NLinked),
            "o-linked" => return Ok(ResidueAlphabet::OLinked),
            "glycosylation" => return Ok(ResidueAlphabet::Glycosylation),
            "" => return Err(InvalidAlphabet::Empty),
            _ => {}
        }

        let mut residues = Vec::with_capacity(s.len());
        for c in s.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(InvalidAlphabet::InvalidResidue(c));
            }
            if !residues.contains(&(c as u8)) {
                residues.push(c as u8);
            }
        }
        Ok(ResidueAlphabet::Custom(residues))
    }
}

impl Display for ResidueAlphabet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResidueAlphabet::All => f.write_str("all"),
            ResidueAlphabet::NLinked => f.write_str("n-linked"),
            ResidueAlphabet::OLinked => f.write_str("o-linked"),
            ResidueAlphabet::Glycosylation => f.write_str("glycosylation"),
            ResidueAlphabet::Custom(residues) => {
                for &r in residues {
                    f.write_char(r as char)?;
                }
                Ok(())
            }
        }
    }
}

impl Serialize for ResidueAlphabet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

struct AlphabetVisitor;

impl<'de> Visitor<'de> for AlphabetVisitor {
    type Value = ResidueAlphabet;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a named residue alphabet or a string of residue letters")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        v.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for ResidueAlphabet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(AlphabetVisitor)
    }
}

/// One modification mention inside an annotation string, e.g. `N[1152]`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Occurrence {
    pub residue: char,
    pub mass_label: String,
}

/// Extracts `residue[mass]` markers from modified peptide sequences.
///
/// Markers whose bracket contents are not purely digits, or whose residue
/// falls outside of the configured alphabet, are not matched.
#[derive(Clone, Debug)]
pub struct AnnotationParser {
    pattern: Regex,
}

impl AnnotationParser {
    pub fn new(alphabet: ResidueAlphabet) -> Result<Self, InvalidAlphabet> {
        if let ResidueAlphabet::Custom(residues) = &alphabet {
            if residues.is_empty() {
                return Err(InvalidAlphabet::Empty);
            }
            if let Some(&r) = residues.iter().find(|r| !r.is_ascii_alphabetic()) {
                return Err(InvalidAlphabet::InvalidResidue(r as char));
            }
        }
        // Only ASCII letters reach the character class, so the pattern always compiles
        let pattern = Regex::new(&format!(
            r"(?P<residue>[{}])\[(?P<mass>\d+)\]",
            alphabet.sites()
        ))
        .expect("residue alphabet yields a valid pattern");
        Ok(Self { pattern })
    }

    /// Iterate over modification markers in left-to-right order
    pub fn occurrences<'s>(&'s self, annotation: &'s str) -> impl Iterator<Item = Occurrence> + 's {
        self.pattern.captures_iter(annotation).filter_map(|cap| {
            let residue = cap.name("residue")?.as_str().chars().next()?;
            let mass_label = cap.name("mass")?.as_str().to_string();
            Some(Occurrence {
                residue,
                mass_label,
            })
        })
    }

    pub fn parse(&self, annotation: &str) -> Vec<Occurrence> {
        self.occurrences(annotation).collect()
    }
}

impl Default for AnnotationParser {
    fn default() -> Self {
        Self::new(ResidueAlphabet::All).expect("built-in alphabet is valid")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn occ(residue: char, mass: &str) -> Occurrence {
        Occurrence {
            residue,
            mass_label: mass.into(),
        }
    }

    #[test]
    fn unmodified_peptide() {
        let parser = AnnotationParser::default();
        assert!(parser.parse("LCVVALDFEQEMATAASSSSLEK").is_empty());
    }

    #[test]
    fn single_glycan() {
        let parser = AnnotationParser::default();
        assert_eq!(
            parser.parse("GLVSGGVYNSHVGCLYTIPPECEHVN[1152]GSRRPCTEGDTR"),
            vec![occ('N', "1152")]
        );
    }

    #[test]
    fn multiple_markers_in_order() {
        let parser = AnnotationParser::default();
        assert_eq!(
            parser.parse("HN[143]N[130]DTQHWEVS[80]DSN[143]ESFVADR"),
            vec![
                occ('N', "143"),
                occ('N', "130"),
                occ('S', "80"),
                occ('N', "143")
            ]
        );
    }

    #[test]
    fn malformed_brackets() {
        let parser = AnnotationParser::default();
        assert!(parser.parse("PEPTIDE[N123]").is_empty());
        assert!(parser.parse("PEPN[12a]TIDE").is_empty());
        assert!(parser.parse("PEPN[123TIDE").is_empty());
        assert!(parser.parse("PEPN123]TIDE").is_empty());
        assert_eq!(parser.parse("PEP[123]"), vec![occ('P', "123")]);
        assert!(parser.parse("[123]PEPTIDE").is_empty());
        assert!(parser.parse("").is_empty());
    }

    #[test]
    fn lowercase_residues() {
        let parser = AnnotationParser::default();
        assert_eq!(parser.parse("pepn[203]k"), vec![occ('n', "203")]);
    }

    #[test]
    fn n_linked_only() {
        let parser = AnnotationParser::new(ResidueAlphabet::NLinked).unwrap();
        assert_eq!(
            parser.parse("VSINTVN[1493]LTAGQPMEVT[80]VFR"),
            vec![occ('N', "1493")]
        );
        assert!(parser.parse("pepn[203]k").is_empty());
    }

    #[test]
    fn parse_alphabets() {
        use ResidueAlphabet::*;
        assert_eq!("all".parse::<ResidueAlphabet>(), Ok(All));
        assert_eq!("n-linked".parse::<ResidueAlphabet>(), Ok(NLinked));
        assert_eq!("o-linked".parse::<ResidueAlphabet>(), Ok(OLinked));
        assert_eq!("glycosylation".parse::<ResidueAlphabet>(), Ok(Glycosylation));
        assert_eq!(
            "NKN".parse::<ResidueAlphabet>(),
            Ok(Custom(vec![b'N', b'K']))
        );
        assert_eq!(
            "N-".parse::<ResidueAlphabet>(),
            Err(InvalidAlphabet::InvalidResidue('-'))
        );
        assert_eq!("".parse::<ResidueAlphabet>(), Err(InvalidAlphabet::Empty));
        assert_eq!(
            AnnotationParser::new(Custom(vec![b']'])).unwrap_err(),
            InvalidAlphabet::InvalidResidue(']')
        );
    }

    #[test]
    fn custom_alphabet() {
        let alphabet: ResidueAlphabet = "KM".parse().unwrap();
        let parser = AnnotationParser::new(alphabet).unwrap();
        assert_eq!(
            parser.parse("M[147]PEPN[203]K[42]"),
            vec![occ('M', "147"), occ('K', "42")]
        );
    }
}
