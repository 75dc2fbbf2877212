use std::collections::{HashMap, VecDeque};

const MAX_PENDING_LINES: usize = 128;
const MAX_PENDING_CONTROL_COMMANDS: usize = 128;
const MAX_OUTPUT_LINES: usize = 256;

/// Commands the session consumes. Parsed and validated here; domain-level
/// validation (slot bounds, bucket membership) stays with the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Roll,
    Equip { slot: u32 },
    Unequip,
    Delete { slot: u32 },
    Exclude { bucket: String, enabled: bool },
    Skip { enabled: bool },
    Display { enabled: bool },
    Inventory,
    Status,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocalAction {
    Help,
    Clear,
    Echo { text: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedCommand {
    Local(LocalAction),
    Queueable(ControlCommand),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandParseError {
    reason: String,
    usage: String,
}

type ParseFn = dyn Fn(&[String]) -> Result<ParsedCommand, CommandParseError> + Send + Sync;

pub struct CommandSpec {
    name: String,
    help: String,
    arg_schema: String,
    parse: Box<ParseFn>,
}

pub struct ConsoleCommandRegistry {
    specs: Vec<CommandSpec>,
    lookup_by_lower_name: HashMap<String, usize>,
}

impl ConsoleCommandRegistry {
    pub fn new() -> Self {
        Self {
            specs: Vec::new(),
            lookup_by_lower_name: HashMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let built_in = "built-in command registration should not fail";
        registry
            .register("help", "List commands", "", parse_help_command)
            .expect(built_in);
        registry
            .register("clear", "Clear console output", "", parse_clear_command)
            .expect(built_in);
        registry
            .register("echo", "Print text back", "<text...>", parse_echo_command)
            .expect(built_in);
        registry
            .register("roll", "Submit a roll", "", parse_roll_command)
            .expect(built_in);
        registry
            .register(
                "equip",
                "Equip an inventory item",
                "<slot:u32>",
                parse_equip_command,
            )
            .expect(built_in);
        registry
            .register("unequip", "Clear the equipped item", "", parse_unequip_command)
            .expect(built_in);
        registry
            .register(
                "delete",
                "Delete an inventory item",
                "<slot:u32>",
                parse_delete_command,
            )
            .expect(built_in);
        registry
            .register(
                "exclude",
                "Toggle auto-delete for a rarity bucket",
                "<bucket> <on|off>",
                parse_exclude_command,
            )
            .expect(built_in);
        registry
            .register(
                "skip",
                "Toggle the skip-cutscene preference",
                "<on|off>",
                parse_skip_command,
            )
            .expect(built_in);
        registry
            .register(
                "display",
                "Toggle the result display",
                "<on|off>",
                parse_display_command,
            )
            .expect(built_in);
        registry
            .register("inventory", "List inventory items", "", parse_inventory_command)
            .expect(built_in);
        registry
            .register("status", "Print session status", "", parse_status_command)
            .expect(built_in);
        registry
            .register("quit", "Quit the app", "", parse_quit_command)
            .expect(built_in);
        registry
    }

    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        help: impl Into<String>,
        arg_schema: impl Into<String>,
        parse: F,
    ) -> Result<(), String>
    where
        F: Fn(&[String]) -> Result<ParsedCommand, CommandParseError> + Send + Sync + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err("command name cannot be empty".to_string());
        }
        let lower = name.to_ascii_lowercase();
        if self.lookup_by_lower_name.contains_key(&lower) {
            return Err(format!("duplicate command registration: {name}"));
        }

        self.specs.push(CommandSpec {
            name,
            help: help.into(),
            arg_schema: arg_schema.into(),
            parse: Box::new(parse),
        });
        self.lookup_by_lower_name.insert(lower, self.specs.len() - 1);
        Ok(())
    }

    pub fn lookup(&self, input_name: &str) -> Option<&CommandSpec> {
        let lower = input_name.to_ascii_lowercase();
        let index = self.lookup_by_lower_name.get(&lower)?;
        self.specs.get(*index)
    }

    pub fn iter_specs_in_order(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        // Help output order is registration order by contract.
        self.specs.iter().map(|spec| {
            (
                spec.name.as_str(),
                spec.help.as_str(),
                spec.arg_schema.as_str(),
            )
        })
    }
}

impl Default for ConsoleCommandRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Line buffers between the remote transport and the session. Both queues
/// are bounded; oldest entries drop first under pressure.
#[derive(Default)]
pub struct ConsoleState {
    pending_lines: VecDeque<String>,
    output_lines: VecDeque<String>,
}

impl ConsoleState {
    pub fn push_pending_line(&mut self, line: impl Into<String>) {
        if self.pending_lines.len() == MAX_PENDING_LINES {
            self.pending_lines.pop_front();
        }
        self.pending_lines.push_back(line.into());
    }

    pub fn drain_pending_lines_into(&mut self, out: &mut Vec<String>) {
        out.extend(self.pending_lines.drain(..));
    }

    pub fn append_output_line(&mut self, line: impl Into<String>) {
        if self.output_lines.len() == MAX_OUTPUT_LINES {
            self.output_lines.pop_front();
        }
        self.output_lines.push_back(line.into());
    }

    pub fn drain_output_lines_into(&mut self, out: &mut Vec<String>) {
        out.extend(self.output_lines.drain(..));
    }

    pub fn output_lines(&self) -> impl Iterator<Item = &str> {
        self.output_lines.iter().map(String::as_str)
    }

    pub fn clear_output_lines(&mut self) {
        self.output_lines.clear();
    }
}

pub struct ConsoleCommandProcessor {
    registry: ConsoleCommandRegistry,
    pending_control_commands: VecDeque<ControlCommand>,
}

impl Default for ConsoleCommandProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleCommandProcessor {
    pub fn new() -> Self {
        Self {
            registry: ConsoleCommandRegistry::with_builtins(),
            pending_control_commands: VecDeque::new(),
        }
    }

    pub fn process_pending_lines(&mut self, console: &mut ConsoleState) {
        let mut lines = Vec::new();
        console.drain_pending_lines_into(&mut lines);

        for raw_line in lines {
            self.process_line(console, &raw_line);
        }
    }

    pub fn drain_pending_control_commands_into(&mut self, out: &mut Vec<ControlCommand>) {
        out.extend(self.pending_control_commands.drain(..));
    }

    fn process_line(&mut self, console: &mut ConsoleState, raw_line: &str) {
        let trimmed = raw_line.trim();
        if trimmed.is_empty() {
            return;
        }

        let tokens = match tokenize_line(trimmed) {
            Ok(tokens) => tokens,
            Err(reason) => {
                console.append_output_line(format!("error: {reason}. usage: help"));
                return;
            }
        };
        if tokens.is_empty() {
            return;
        }

        let command_name = &tokens[0];
        let args = &tokens[1..];
        let Some(spec) = self.registry.lookup(command_name) else {
            console.append_output_line(format!(
                "error: unknown command '{}'. try: help",
                command_name
            ));
            return;
        };

        match (spec.parse)(args) {
            Ok(ParsedCommand::Local(action)) => self.apply_local_action(console, action),
            Ok(ParsedCommand::Queueable(command)) => self.push_queueable(command),
            Err(error) => {
                console
                    .append_output_line(format!("error: {}. usage: {}", error.reason, error.usage));
            }
        }
    }

    fn apply_local_action(&self, console: &mut ConsoleState, action: LocalAction) {
        match action {
            LocalAction::Help => {
                for (name, help, arg_schema) in self.registry.iter_specs_in_order() {
                    let line = if arg_schema.is_empty() {
                        format!("{name} - {help}")
                    } else {
                        format!("{name} {arg_schema} - {help}")
                    };
                    console.append_output_line(line);
                }
            }
            LocalAction::Clear => {
                console.clear_output_lines();
            }
            LocalAction::Echo { text } => {
                console.append_output_line(text);
            }
        }
    }

    fn push_queueable(&mut self, command: ControlCommand) {
        if self.pending_control_commands.len() == MAX_PENDING_CONTROL_COMMANDS {
            self.pending_control_commands.pop_front();
        }
        self.pending_control_commands.push_back(command);
    }
}

fn tokenize_line(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut seen_token_content = false;
    let mut just_closed_quote = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                seen_token_content = true;
                if !in_quotes {
                    just_closed_quote = true;
                }
            }
            c if c.is_whitespace() && !in_quotes => {
                if seen_token_content || just_closed_quote || !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                    seen_token_content = false;
                    just_closed_quote = false;
                }
            }
            _ => {
                current.push(ch);
                seen_token_content = true;
                just_closed_quote = false;
            }
        }
    }

    if in_quotes {
        return Err("unterminated quoted string".to_string());
    }

    if seen_token_content || just_closed_quote || !current.is_empty() {
        tokens.push(current);
    }

    Ok(tokens)
}

fn parse_help_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "help")?;
    Ok(ParsedCommand::Local(LocalAction::Help))
}

fn parse_clear_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "clear")?;
    Ok(ParsedCommand::Local(LocalAction::Clear))
}

fn parse_echo_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    if args.is_empty() {
        return Err(CommandParseError {
            reason: "missing required argument <text...>".to_string(),
            usage: "echo <text...>".to_string(),
        });
    }
    Ok(ParsedCommand::Local(LocalAction::Echo {
        text: args.join(" "),
    }))
}

fn parse_roll_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "roll")?;
    Ok(ParsedCommand::Queueable(ControlCommand::Roll))
}

fn parse_equip_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    let slot = parse_slot_arg(args, "equip")?;
    Ok(ParsedCommand::Queueable(ControlCommand::Equip { slot }))
}

fn parse_unequip_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "unequip")?;
    Ok(ParsedCommand::Queueable(ControlCommand::Unequip))
}

fn parse_delete_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    let slot = parse_slot_arg(args, "delete")?;
    Ok(ParsedCommand::Queueable(ControlCommand::Delete { slot }))
}

fn parse_exclude_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    if args.len() != 2 {
        return Err(CommandParseError {
            reason: "expected exactly two arguments <bucket> <on|off>".to_string(),
            usage: "exclude <bucket> <on|off>".to_string(),
        });
    }
    let enabled = parse_on_off(&args[1], "exclude <bucket> <on|off>")?;
    Ok(ParsedCommand::Queueable(ControlCommand::Exclude {
        bucket: args[0].clone(),
        enabled,
    }))
}

fn parse_skip_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    let enabled = parse_single_on_off(args, "skip <on|off>")?;
    Ok(ParsedCommand::Queueable(ControlCommand::Skip { enabled }))
}

fn parse_display_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    let enabled = parse_single_on_off(args, "display <on|off>")?;
    Ok(ParsedCommand::Queueable(ControlCommand::Display { enabled }))
}

fn parse_inventory_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "inventory")?;
    Ok(ParsedCommand::Queueable(ControlCommand::Inventory))
}

fn parse_status_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "status")?;
    Ok(ParsedCommand::Queueable(ControlCommand::Status))
}

fn parse_quit_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "quit")?;
    Ok(ParsedCommand::Queueable(ControlCommand::Quit))
}

fn parse_slot_arg(args: &[String], command: &str) -> Result<u32, CommandParseError> {
    if args.len() != 1 {
        return Err(CommandParseError {
            reason: "expected exactly one argument <slot>".to_string(),
            usage: format!("{command} <slot>"),
        });
    }
    args[0].parse::<u32>().map_err(|_| CommandParseError {
        reason: format!("invalid slot '{}' (expected u32)", args[0]),
        usage: format!("{command} <slot>"),
    })
}

fn parse_single_on_off(args: &[String], usage: &str) -> Result<bool, CommandParseError> {
    if args.len() != 1 {
        return Err(CommandParseError {
            reason: "expected exactly one argument <on|off>".to_string(),
            usage: usage.to_string(),
        });
    }
    parse_on_off(&args[0], usage)
}

fn parse_on_off(value: &str, usage: &str) -> Result<bool, CommandParseError> {
    match value.to_ascii_lowercase().as_str() {
        "on" => Ok(true),
        "off" => Ok(false),
        other => Err(CommandParseError {
            reason: format!("invalid toggle '{other}' (expected on|off)"),
            usage: usage.to_string(),
        }),
    }
}

fn require_no_args(args: &[String], usage: &str) -> Result<(), CommandParseError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(CommandParseError {
            reason: "unexpected extra arguments".to_string(),
            usage: usage.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_output(console: &ConsoleState) -> Vec<String> {
        console.output_lines().map(ToString::to_string).collect()
    }

    fn drain_commands(processor: &mut ConsoleCommandProcessor) -> Vec<ControlCommand> {
        let mut queued = Vec::new();
        processor.drain_pending_control_commands_into(&mut queued);
        queued
    }

    #[test]
    fn help_lists_commands_in_registration_order() {
        let mut processor = ConsoleCommandProcessor::new();
        let mut console = ConsoleState::default();
        console.push_pending_line("help");

        processor.process_pending_lines(&mut console);
        let lines = collect_output(&console);

        assert_eq!(lines[0], "help - List commands");
        assert_eq!(lines[1], "clear - Clear console output");
        assert_eq!(lines[2], "echo <text...> - Print text back");
        assert_eq!(lines[3], "roll - Submit a roll");
        assert_eq!(lines[4], "equip <slot:u32> - Equip an inventory item");
        assert_eq!(lines[12], "quit - Quit the app");
    }

    #[test]
    fn unknown_command_reports_clear_error() {
        let mut processor = ConsoleCommandProcessor::new();
        let mut console = ConsoleState::default();
        console.push_pending_line("nope");

        processor.process_pending_lines(&mut console);

        assert_eq!(
            collect_output(&console),
            vec!["error: unknown command 'nope'. try: help"]
        );
    }

    #[test]
    fn bad_args_report_usage_hint() {
        let mut processor = ConsoleCommandProcessor::new();
        let mut console = ConsoleState::default();
        console.push_pending_line("equip foo");

        processor.process_pending_lines(&mut console);

        assert_eq!(
            collect_output(&console),
            vec!["error: invalid slot 'foo' (expected u32). usage: equip <slot>"]
        );
    }

    #[test]
    fn local_commands_are_immediate_and_not_enqueued() {
        let mut processor = ConsoleCommandProcessor::new();
        let mut console = ConsoleState::default();
        console.push_pending_line("echo hi");
        console.push_pending_line("clear");
        console.push_pending_line("echo bye");

        processor.process_pending_lines(&mut console);

        assert!(drain_commands(&mut processor).is_empty());
        assert_eq!(collect_output(&console), vec!["bye"]);
    }

    #[test]
    fn queueable_parse_success_enqueues_control_commands() {
        let mut processor = ConsoleCommandProcessor::new();
        let mut console = ConsoleState::default();
        console.push_pending_line("roll");
        console.push_pending_line("equip 3");
        console.push_pending_line("exclude under1k on");
        console.push_pending_line("skip off");
        console.push_pending_line("quit");

        processor.process_pending_lines(&mut console);

        assert_eq!(
            drain_commands(&mut processor),
            vec![
                ControlCommand::Roll,
                ControlCommand::Equip { slot: 3 },
                ControlCommand::Exclude {
                    bucket: "under1k".to_string(),
                    enabled: true,
                },
                ControlCommand::Skip { enabled: false },
                ControlCommand::Quit,
            ]
        );
        assert!(collect_output(&console).is_empty());
    }

    #[test]
    fn exclude_rejects_bad_toggle() {
        let mut processor = ConsoleCommandProcessor::new();
        let mut console = ConsoleState::default();
        console.push_pending_line("exclude under1k maybe");

        processor.process_pending_lines(&mut console);

        assert_eq!(
            collect_output(&console),
            vec!["error: invalid toggle 'maybe' (expected on|off). usage: exclude <bucket> <on|off>"]
        );
    }

    #[test]
    fn tokenizer_handles_quotes_and_errors() {
        assert_eq!(
            tokenize_line("echo \"two words\" tail").expect("tokens"),
            vec!["echo", "two words", "tail"]
        );
        assert!(tokenize_line("echo \"oops").is_err());
    }

    #[test]
    fn processor_drains_lines_once() {
        let mut processor = ConsoleCommandProcessor::new();
        let mut console = ConsoleState::default();
        console.push_pending_line("roll");

        processor.process_pending_lines(&mut console);
        processor.process_pending_lines(&mut console);

        assert_eq!(drain_commands(&mut processor), vec![ControlCommand::Roll]);
    }

    #[test]
    fn pending_queues_are_bounded() {
        let mut processor = ConsoleCommandProcessor::new();
        let mut console = ConsoleState::default();
        for _ in 0..(MAX_PENDING_LINES + 16) {
            console.push_pending_line("roll");
        }

        processor.process_pending_lines(&mut console);
        let queued = drain_commands(&mut processor);
        assert_eq!(
            queued.len(),
            MAX_PENDING_CONTROL_COMMANDS.min(MAX_PENDING_LINES)
        );
    }

    #[test]
    fn output_lines_are_bounded_dropping_oldest() {
        let mut console = ConsoleState::default();
        for index in 0..(MAX_OUTPUT_LINES + 2) {
            console.append_output_line(format!("line-{index}"));
        }

        let lines = collect_output(&console);
        assert_eq!(lines.len(), MAX_OUTPUT_LINES);
        assert_eq!(lines[0], "line-2");
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = ConsoleCommandRegistry::with_builtins();
        let result = registry.register("roll", "dup", "", parse_roll_command);
        assert!(result.is_err());
    }
}
