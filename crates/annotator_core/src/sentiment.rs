use std::fmt;
use std::str::FromStr;

/// Tri-state classification derived from a subject's sub-scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sentiment {
    Positive,
    Negative,
    Unscored,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sentiment {0:?}")]
pub struct UnknownSentiment(pub String);

impl Sentiment {
    /// Filter bar order.
    pub const ALL: [Sentiment; 3] = [Sentiment::Negative, Sentiment::Positive, Sentiment::Unscored];

    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Unscored => "unscored",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Unscored => "Unscored",
        }
    }

    /// Negative wins over positive; anything else is unscored.
    ///
    /// Each item is the polarity of one sub-score, `None` when the sub-score is
    /// absent or carries a label that is neither positive nor negative.
    pub fn derive<I>(polarities: I) -> Self
    where
        I: IntoIterator<Item = Option<Sentiment>>,
    {
        let mut seen_positive = false;
        for polarity in polarities.into_iter().flatten() {
            match polarity {
                Sentiment::Negative => return Sentiment::Negative,
                Sentiment::Positive => seen_positive = true,
                Sentiment::Unscored => {}
            }
        }
        if seen_positive {
            Sentiment::Positive
        } else {
            Sentiment::Unscored
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = UnknownSentiment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "positive" => Ok(Sentiment::Positive),
            "negative" => Ok(Sentiment::Negative),
            "unscored" => Ok(Sentiment::Unscored),
            other => Err(UnknownSentiment(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Sentiment;

    #[test]
    fn negative_dominates_positive() {
        let derived = Sentiment::derive([Some(Sentiment::Positive), Some(Sentiment::Negative)]);
        assert_eq!(derived, Sentiment::Negative);
    }

    #[test]
    fn single_positive_is_positive() {
        assert_eq!(
            Sentiment::derive([Some(Sentiment::Positive), None]),
            Sentiment::Positive
        );
    }

    #[test]
    fn nothing_known_is_unscored() {
        assert_eq!(Sentiment::derive([None, None]), Sentiment::Unscored);
        assert_eq!(Sentiment::derive(Vec::new()), Sentiment::Unscored);
    }

    #[test]
    fn attribute_values_parse_back() {
        for sentiment in Sentiment::ALL {
            assert_eq!(sentiment.as_str().parse::<Sentiment>(), Ok(sentiment));
        }
        assert!("unknown".parse::<Sentiment>().is_err());
    }
}
