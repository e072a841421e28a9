//! Streaming Hangul composer and the string-level assembler.
//!
//! The composer is a small state machine fed one jamo event at a time. It
//! applies the LVTT merge rules: compound vowels form when two medials
//! combine, compound finals when two finals combine, and a trailing final
//! carries over as the next initial when a vowel follows.

use thiserror::Error;

use crate::jamo;
use crate::syllable;

/// Errors from the strict syllable builder.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HangulError {
    /// The strict assembler met a token that is not a recognized jamo.
    #[error("unrecognized jamo token {token:?}")]
    InvalidComponents { token: char },
}

/// One jamo fed to the composer.
///
/// Consonants carry their choseong index (absent for final-only compounds
/// such as ㄳ) and their jongseong index (absent for ㄸ ㅃ ㅉ, which cannot
/// close a syllable).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JamoEvent {
    Consonant {
        choseong: Option<u32>,
        jongseong: Option<u32>,
    },
    Vowel {
        jungseong: u32,
    },
}

/// Classify a compatibility jamo character as a composer event.
pub fn classify_compat(c: char) -> Option<JamoEvent> {
    if jamo::is_compat_vowel(c) {
        return jamo::jungseong_index(c).map(|jungseong| JamoEvent::Vowel { jungseong });
    }
    if jamo::is_compat_consonant(c) {
        let choseong = jamo::choseong_index(c);
        let jongseong = jamo::jongseong_index(c);
        if choseong.is_none() && jongseong.is_none() {
            return None;
        }
        return Some(JamoEvent::Consonant { choseong, jongseong });
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Empty,
    /// A lone initial consonant.
    Choseong,
    /// A lone medial vowel (may still merge into a compound vowel).
    Jungseong,
    /// Initial + medial.
    ChoseongJungseong,
    /// Initial + medial + final.
    ChoseongJungseongJongseong,
}

/// Streaming syllable composer.
pub struct Composer {
    state: State,
    choseong: u32,
    jungseong: u32,
    jongseong: u32,
    output: String,
}

impl Composer {
    pub fn new() -> Self {
        Self {
            state: State::Empty,
            choseong: 0,
            jungseong: 0,
            jongseong: 0,
            output: String::new(),
        }
    }

    /// Feed one jamo event.
    pub fn feed(&mut self, event: JamoEvent) {
        match event {
            JamoEvent::Consonant { choseong, jongseong } => self.feed_consonant(choseong, jongseong),
            JamoEvent::Vowel { jungseong } => self.feed_vowel(jungseong),
        }
    }

    /// Feed a character that is not part of any syllable: flush the pending
    /// syllable and pass the character through.
    pub fn feed_passthrough(&mut self, c: char) {
        self.flush_pending();
        self.output.push(c);
    }

    /// Flush the pending syllable and return everything composed so far.
    pub fn finish(mut self) -> String {
        self.flush_pending();
        self.output
    }

    fn feed_consonant(&mut self, cho: Option<u32>, jong: Option<u32>) {
        match self.state {
            State::Empty => match cho {
                Some(c) => {
                    self.choseong = c;
                    self.state = State::Choseong;
                }
                // Final-only compounds (ㄳ ㄵ ...) cannot start a syllable.
                None => {
                    if let Some(j) = jong.and_then(jamo::jongseong_char) {
                        self.output.push(j);
                    }
                }
            },
            State::Choseong => {
                // The previous initial stands alone; restart with the new one.
                if let Some(c) = jamo::choseong_char(self.choseong) {
                    self.output.push(c);
                }
                self.restart_consonant(cho, jong);
            }
            State::Jungseong => {
                if let Some(c) = jamo::jungseong_char(self.jungseong) {
                    self.output.push(c);
                }
                self.restart_consonant(cho, jong);
            }
            State::ChoseongJungseong => match jong {
                Some(j) => {
                    self.jongseong = j;
                    self.state = State::ChoseongJungseongJongseong;
                }
                None => {
                    // ㄸ ㅃ ㅉ cannot close a syllable.
                    self.flush_pending();
                    self.restart_consonant(cho, jong);
                }
            },
            State::ChoseongJungseongJongseong => {
                if let Some(combined) = jong.and_then(|j| jamo::combine_jongseong(self.jongseong, j)) {
                    self.jongseong = combined;
                } else {
                    self.flush_pending();
                    self.restart_consonant(cho, jong);
                }
            }
        }
    }

    fn feed_vowel(&mut self, jung: u32) {
        match self.state {
            State::Empty => {
                self.jungseong = jung;
                self.state = State::Jungseong;
            }
            State::Choseong => {
                self.jungseong = jung;
                self.state = State::ChoseongJungseong;
            }
            State::Jungseong => {
                if let Some(combined) = jamo::combine_jungseong(self.jungseong, jung) {
                    self.jungseong = combined;
                } else {
                    if let Some(c) = jamo::jungseong_char(self.jungseong) {
                        self.output.push(c);
                    }
                    self.jungseong = jung;
                }
            }
            State::ChoseongJungseong => {
                if let Some(combined) = jamo::combine_jungseong(self.jungseong, jung) {
                    self.jungseong = combined;
                } else {
                    self.flush_pending();
                    self.jungseong = jung;
                    self.state = State::Jungseong;
                }
            }
            State::ChoseongJungseongJongseong => {
                // The final (or its second component) carries over as the
                // initial of the syllable the new vowel opens.
                if let Some((remaining, next_cho)) = jamo::split_jongseong(self.jongseong) {
                    self.jongseong = remaining;
                    self.flush_pending();
                    self.choseong = next_cho;
                    self.jungseong = jung;
                    self.state = State::ChoseongJungseong;
                } else if let Some(next_cho) = jamo::jongseong_to_choseong(self.jongseong) {
                    self.jongseong = 0;
                    self.flush_pending();
                    self.choseong = next_cho;
                    self.jungseong = jung;
                    self.state = State::ChoseongJungseong;
                } else {
                    self.flush_pending();
                    self.jungseong = jung;
                    self.state = State::Jungseong;
                }
            }
        }
    }

    fn restart_consonant(&mut self, cho: Option<u32>, jong: Option<u32>) {
        match cho {
            Some(c) => {
                self.choseong = c;
                self.state = State::Choseong;
            }
            None => {
                if let Some(j) = jong.and_then(jamo::jongseong_char) {
                    self.output.push(j);
                }
                self.state = State::Empty;
            }
        }
    }

    fn flush_pending(&mut self) {
        match self.state {
            State::Empty => {}
            State::Choseong => {
                if let Some(c) = jamo::choseong_char(self.choseong) {
                    self.output.push(c);
                }
            }
            State::Jungseong => {
                if let Some(c) = jamo::jungseong_char(self.jungseong) {
                    self.output.push(c);
                }
            }
            State::ChoseongJungseong => {
                if let Some(c) = syllable::compose(self.choseong, self.jungseong, 0) {
                    self.output.push(c);
                }
            }
            State::ChoseongJungseongJongseong => {
                if let Some(c) = syllable::compose(self.choseong, self.jungseong, self.jongseong) {
                    self.output.push(c);
                }
            }
        }
        self.state = State::Empty;
        self.choseong = 0;
        self.jungseong = 0;
        self.jongseong = 0;
    }
}

impl Default for Composer {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble a string of compatibility jamo (plus arbitrary other characters)
/// into precomposed syllables. Non-jamo characters flush the pending syllable
/// and pass through.
pub fn assemble(input: &str) -> String {
    let mut composer = Composer::new();
    for c in input.chars() {
        match classify_compat(c) {
            Some(event) => composer.feed(event),
            None => composer.feed_passthrough(c),
        }
    }
    composer.finish()
}

/// Strict assembler: every character must be a recognized compatibility jamo.
pub fn assemble_strict(input: &str) -> Result<String, HangulError> {
    let mut composer = Composer::new();
    for c in input.chars() {
        match classify_compat(c) {
            Some(event) => composer.feed(event),
            None => return Err(HangulError::InvalidComponents { token: c }),
        }
    }
    Ok(composer.finish())
}

/// Disassemble precomposed syllables into compatibility jamo, keeping
/// compound vowels and finals together. Other characters are preserved.
pub fn disassemble(input: &str) -> String {
    let mut out = String::with_capacity(input.len() * 2);
    for c in input.chars() {
        if let Some((l, v, t)) = syllable::decompose(c) {
            out.push(jamo::CHOSEONG_CHARS[l as usize]);
            out.push(jamo::JUNGSEONG_CHARS[v as usize]);
            if let Some(f) = jamo::jongseong_char(t) {
                out.push(f);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_basic() {
        assert_eq!(assemble("ㅎㅏㄴㄱㅡㄹ"), "한글");
        assert_eq!(assemble("ㄱㅏ"), "가");
        assert_eq!(assemble("ㄱ"), "ㄱ");
    }

    #[test]
    fn test_assemble_final_carry_over() {
        // ㄱㅏㅂㅅㅣ: the ㅅ of the compound final opens the next syllable.
        assert_eq!(assemble("ㄱㅏㅂㅅㅣ"), "갑시");
        // Single final carries over when a vowel follows.
        assert_eq!(assemble("ㄱㅏㄴㅏ"), "가나");
    }

    #[test]
    fn test_assemble_compound_vowel() {
        assert_eq!(assemble("ㅇㅗㅏ"), "와");
        assert_eq!(assemble("ㄱㅗㅏㄴ"), "관");
        // Vowel-first input still merges compounds.
        assert_eq!(assemble("ㅗㅏ"), "ㅘ");
    }

    #[test]
    fn test_assemble_passthrough() {
        assert_eq!(assemble("ㄱㅏ nice"), "가 nice");
        assert_eq!(assemble("abc"), "abc");
    }

    #[test]
    fn test_assemble_strict_rejects_non_jamo() {
        assert_eq!(assemble_strict("ㅎㅏㄴ"), Ok("한".to_string()));
        assert_eq!(
            assemble_strict("ㅎㅏx"),
            Err(HangulError::InvalidComponents { token: 'x' })
        );
        assert_eq!(
            assemble_strict("한"),
            Err(HangulError::InvalidComponents { token: '한' })
        );
    }

    #[test]
    fn test_disassemble_keeps_compounds() {
        assert_eq!(disassemble("값"), "ㄱㅏㅄ");
        assert_eq!(disassemble("와"), "ㅇㅘ");
        assert_eq!(disassemble("한글 abc"), "ㅎㅏㄴㄱㅡㄹ abc");
    }

    #[test]
    fn test_assemble_disassemble_roundtrip() {
        for s in ["한글", "프론트엔드", "값비싼 의자", "검색 v2!", "앉아", "힣"] {
            assert_eq!(assemble(&disassemble(s)), s, "roundtrip failed for {s}");
        }
    }
}
