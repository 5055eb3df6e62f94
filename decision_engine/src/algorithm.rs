use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::action::ActionSpaceType;
use crate::error::EngineError;

/// The closed set of learning algorithms an engine can be built for.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    PPO,
    A2C,
    DQN,
    TD3,
    SAC,
}

impl Algorithm {
    pub const ALL: [Algorithm; 5] = [Self::PPO, Self::A2C, Self::DQN, Self::TD3, Self::SAC];

    /// On-policy algorithms learn from their own fresh rollouts; the rest replay past transitions.
    pub fn is_on_policy(&self) -> bool {
        matches!(self, Self::PPO | Self::A2C)
    }

    pub fn supports(&self, space: ActionSpaceType) -> bool {
        match self {
            Self::PPO | Self::A2C => true,
            Self::DQN => space == ActionSpaceType::Discrete,
            Self::TD3 | Self::SAC => space == ActionSpaceType::Continuous,
        }
    }
}

impl FromStr for Algorithm {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PPO" => Ok(Self::PPO),
            "A2C" => Ok(Self::A2C),
            "DQN" => Ok(Self::DQN),
            "TD3" => Ok(Self::TD3),
            "SAC" => Ok(Self::SAC),
            _ => Err(EngineError::unsupported(s.trim())),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PPO => "PPO",
            Self::A2C => "A2C",
            Self::DQN => "DQN",
            Self::TD3 => "TD3",
            Self::SAC => "SAC",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("ppo".parse::<Algorithm>().unwrap(), Algorithm::PPO);
        assert_eq!(" Sac ".parse::<Algorithm>().unwrap(), Algorithm::SAC);
        for algo in Algorithm::ALL {
            assert_eq!(algo.to_string().parse::<Algorithm>().unwrap(), algo);
        }
    }

    #[test]
    fn test_unknown_algorithm_names_the_value() {
        let err = "DDPG".parse::<Algorithm>().unwrap_err();
        assert!(err.to_string().contains("DDPG"));
    }

    #[test]
    fn test_action_space_support() {
        assert!(Algorithm::DQN.supports(ActionSpaceType::Discrete));
        assert!(!Algorithm::DQN.supports(ActionSpaceType::Continuous));
        assert!(!Algorithm::TD3.supports(ActionSpaceType::Discrete));
        assert!(Algorithm::PPO.supports(ActionSpaceType::Discrete));
        assert!(Algorithm::A2C.supports(ActionSpaceType::Continuous));
        assert!(Algorithm::A2C.is_on_policy());
        assert!(!Algorithm::SAC.is_on_policy());
    }
}
