/// Available commands and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  /// Placeholder shown for a required argument, if the command takes one
  pub argument: Option<&'static str>,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "browse",
    aliases: &["b", "games", "catalog"],
    description: "Browse the game catalog",
    argument: None,
  },
  Command {
    name: "discover",
    aliases: &["d", "top", "trending"],
    description: "Top rated and trending games",
    argument: None,
  },
  Command {
    name: "search",
    aliases: &["s", "find"],
    description: "Quick search by title",
    argument: None,
  },
  Command {
    name: "game",
    aliases: &["g"],
    description: "Open a game by id",
    argument: Some("<id>"),
  },
  Command {
    name: "history",
    aliases: &["h", "sessions", "plays"],
    description: "Play history and current session",
    argument: None,
  },
  Command {
    name: "wishlist",
    aliases: &["w", "wish"],
    description: "Your wishlist",
    argument: None,
  },
  Command {
    name: "users",
    aliases: &["u", "admin-users"],
    description: "Manage users (admin)",
    argument: None,
  },
  Command {
    name: "reviews",
    aliases: &["r", "admin-reviews"],
    description: "Moderate reviews (admin)",
    argument: None,
  },
  Command {
    name: "audit",
    aliases: &["a", "audit-log", "logs"],
    description: "Admin audit log (admin)",
    argument: None,
  },
  Command {
    name: "clear-cache",
    aliases: &["cc", "logout"],
    description: "Drop all cached data",
    argument: None,
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit checkpointer",
    argument: None,
  },
];

/// A submitted command line split into the command word and its argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
  pub name: String,
  pub arg: Option<String>,
}

impl CommandLine {
  /// Split raw input at the first whitespace; the argument is trimmed.
  pub fn parse(input: &str) -> Self {
    let trimmed = input.trim();
    match trimmed.split_once(char::is_whitespace) {
      Some((name, rest)) => {
        let rest = rest.trim();
        Self {
          name: name.to_lowercase(),
          arg: (!rest.is_empty()).then(|| rest.to_string()),
        }
      }
      None => Self {
        name: trimmed.to_lowercase(),
        arg: None,
      },
    }
  }
}

/// Resolve a command word to its command by name or alias
pub fn find(word: &str) -> Option<&'static Command> {
  let word = word.to_lowercase();
  COMMANDS
    .iter()
    .find(|cmd| cmd.name == word || cmd.aliases.contains(&word.as_str()))
}

/// Get autocomplete suggestions for a given input.
///
/// Only the command word is matched; once an argument is being typed the
/// suggestions narrow to the command that takes it.
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let line = CommandLine::parse(input);
  if line.arg.is_some() || (input.ends_with(char::is_whitespace) && !line.name.is_empty()) {
    return find(&line.name)
      .filter(|cmd| cmd.argument.is_some())
      .into_iter()
      .collect();
  }

  let input_lower = line.name;

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    if cmd.name == input_lower {
      matches.push((cmd, 0));
      continue;
    }

    if cmd.aliases.contains(&input_lower.as_str()) {
      matches.push((cmd, 1));
      continue;
    }

    if cmd.name.starts_with(&input_lower) {
      matches.push((cmd, 2));
      continue;
    }

    if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((cmd, 3));
      continue;
    }

    // Fuzzy match (contains)
    if cmd.name.contains(&input_lower) {
      matches.push((cmd, 4));
      continue;
    }

    if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      matches.push((cmd, 5));
    }
  }

  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}
