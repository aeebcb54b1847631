use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The actions selected with `--action`, by number or by name.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Action {
    CreateRole,
    Launch,
    EnableAccess,
    Terminate,
    DisableAccess,
}

impl Action {
    pub(crate) fn needs_ingress_cidr(&self) -> bool {
        matches!(self, Action::EnableAccess | Action::DisableAccess)
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" | "create-role" => Ok(Action::CreateRole),
            "2" | "launch" => Ok(Action::Launch),
            "3" | "enable-access" => Ok(Action::EnableAccess),
            "4" | "terminate" => Ok(Action::Terminate),
            "5" | "disable-access" => Ok(Action::DisableAccess),
            _ => Err(format!(
                "unknown action '{}', expected 1-5 or one of create-role, launch, \
                enable-access, terminate, disable-access",
                s
            )),
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Action::CreateRole => "create-role",
            Action::Launch => "launch",
            Action::EnableAccess => "enable-access",
            Action::Terminate => "terminate",
            Action::DisableAccess => "disable-access",
        };
        Display::fmt(s, f)
    }
}

#[test]
fn parse_by_number_and_name() {
    for (number, action) in [
        ("1", Action::CreateRole),
        ("2", Action::Launch),
        ("3", Action::EnableAccess),
        ("4", Action::Terminate),
        ("5", Action::DisableAccess),
    ] {
        assert_eq!(number.parse::<Action>().unwrap(), action);
        assert_eq!(action.to_string().parse::<Action>().unwrap(), action);
    }
    assert!("6".parse::<Action>().is_err());
    assert!("0".parse::<Action>().is_err());
}
