use crate::shell::command::Command;

pub fn parse_command(input: &str) -> Option<Command> {
    let tokens: Vec<&str> = input.trim().split_ascii_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }

    let cmd = tokens[0];
    let args = &tokens[1..];
    let number = |i: usize| args.get(i).and_then(|s| s.parse::<usize>().ok());

    match cmd {
        "help" => Some(Command::Help),
        "cr" | "create" => args.first().map(|&name| Command::Create(name.to_string())),
        "de" | "rm" => args.first().map(|&name| Command::Destroy(name.to_string())),
        "op" | "open" => args.first().map(|&name| Command::Open(name.to_string())),
        "cl" | "close" => number(0).map(Command::Close),
        "rd" | "read" => Some(Command::Read(number(0)?, number(1)?)),
        "wr" | "write" => {
            let mut chars = args.get(1)?.chars();
            let ch = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            Some(Command::Write(number(0)?, ch, number(2)?))
        }
        "sk" | "seek" => Some(Command::Seek(number(0)?, number(1)?)),
        "dr" | "ls" => Some(Command::Dir),
        "in" | "format" => Some(Command::Init(args.first().map(|s| s.to_string()))),
        "sv" | "save" => args.first().map(|&path| Command::Save(path.to_string())),
        "st" | "stat" => Some(Command::Status),
        "exit" | "quit" => Some(Command::Exit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_file_commands() {
        assert_eq!(parse_command("cr ab"), Some(Command::Create("ab".into())));
        assert_eq!(parse_command("  rm  ab "), Some(Command::Destroy("ab".into())));
        assert_eq!(parse_command("op ab"), Some(Command::Open("ab".into())));
        assert_eq!(parse_command("cl 1"), Some(Command::Close(1)));
        assert_eq!(parse_command("rd 1 10"), Some(Command::Read(1, 10)));
        assert_eq!(parse_command("wr 2 x 70"), Some(Command::Write(2, 'x', 70)));
        assert_eq!(parse_command("sk 3 64"), Some(Command::Seek(3, 64)));
        assert_eq!(parse_command("dr"), Some(Command::Dir));
    }

    #[test]
    fn parses_disk_commands() {
        assert_eq!(parse_command("in"), Some(Command::Init(None)));
        assert_eq!(
            parse_command("in disk.img"),
            Some(Command::Init(Some("disk.img".into())))
        );
        assert_eq!(parse_command("sv out.img"), Some(Command::Save("out.img".into())));
        assert_eq!(parse_command("st"), Some(Command::Status));
        assert_eq!(parse_command("exit"), Some(Command::Exit));
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("cr"), None);
        assert_eq!(parse_command("cl x"), None);
        assert_eq!(parse_command("rd 1"), None);
        assert_eq!(parse_command("rd 1 -5"), None);
        assert_eq!(parse_command("wr 1 xy 3"), None);
        assert_eq!(parse_command("sv"), None);
        assert_eq!(parse_command("mkdir a"), None);
    }
}
