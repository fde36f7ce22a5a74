use anyhow::{Result, bail};
use tracing::debug;

/// One pipeline stage as parsed: its argv plus flags telling whether the
/// neighbors feed it through a pipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub argv: Vec<String>,
    pub piped_input: bool,
    pub piped_output: bool,
}

/// One pipeline as parsed from a `;`/`&`-separated segment of the input
/// line: the ordered stages, a background flag and the whole-pipeline
/// redirect targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPipeline {
    /// The segment text, for job display.
    pub text: String,
    pub commands: Vec<ParsedCommand>,
    pub background: bool,
    pub infile: Option<String>,
    pub outfile: Option<String>,
    pub appfile: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Word(String),
    Pipe,
    RedirIn,
    RedirOut,
    RedirApp,
}

/// Parse one input line into pipelines. `;` separates pipelines, a `&`
/// terminates a pipeline and marks it background.
pub fn parse_line(line: &str) -> Result<Vec<ParsedPipeline>> {
    let mut pipelines = Vec::new();
    for (text, background) in split_segments(line) {
        if let Some(pipeline) = parse_segment(&text, background)? {
            pipelines.push(pipeline);
        }
    }
    debug!("parsed {} pipeline(s)", pipelines.len());
    Ok(pipelines)
}

fn split_segments(line: &str) -> Vec<(String, bool)> {
    let mut segments = Vec::new();
    let mut current = String::new();
    for c in line.chars() {
        match c {
            ';' | '\n' => {
                segments.push((std::mem::take(&mut current), false));
            }
            '&' => {
                segments.push((std::mem::take(&mut current), true));
            }
            _ => current.push(c),
        }
    }
    segments.push((current, false));
    segments
        .into_iter()
        .map(|(text, bg)| (text.trim().to_string(), bg))
        .filter(|(text, _)| !text.is_empty())
        .collect()
}

fn tokenize(segment: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut chars = segment.chars().peekable();

    let flush = |word: &mut String, tokens: &mut Vec<Token>| {
        if !word.is_empty() {
            tokens.push(Token::Word(std::mem::take(word)));
        }
    };

    while let Some(c) = chars.next() {
        match c {
            '|' => {
                flush(&mut word, &mut tokens);
                tokens.push(Token::Pipe);
            }
            '<' => {
                flush(&mut word, &mut tokens);
                tokens.push(Token::RedirIn);
            }
            '>' => {
                flush(&mut word, &mut tokens);
                if chars.peek() == Some(&'>') {
                    chars.next();
                    tokens.push(Token::RedirApp);
                } else {
                    tokens.push(Token::RedirOut);
                }
            }
            c if c.is_whitespace() => flush(&mut word, &mut tokens),
            _ => word.push(c),
        }
    }
    flush(&mut word, &mut tokens);
    tokens
}

/// Expand `$VAR` from the environment and `$$` to the shell pid. Unknown
/// variables expand to nothing; a `$` not followed by a name is literal.
fn expand_vars(word: &str) -> String {
    let mut out = String::new();
    let mut chars = word.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('$') => {
                chars.next();
                out.push_str(&std::process::id().to_string());
            }
            Some(c2) if c2.is_ascii_alphabetic() || *c2 == '_' => {
                let mut name = String::new();
                while let Some(&c3) = chars.peek() {
                    if c3.is_ascii_alphanumeric() || c3 == '_' {
                        name.push(c3);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if let Ok(val) = std::env::var(&name) {
                    out.push_str(&val);
                }
            }
            _ => out.push('$'),
        }
    }
    out
}

fn parse_segment(text: &str, background: bool) -> Result<Option<ParsedPipeline>> {
    let tokens = tokenize(text);
    if tokens.is_empty() {
        return Ok(None);
    }

    let mut commands: Vec<ParsedCommand> = Vec::new();
    let mut argv: Vec<String> = Vec::new();
    let mut piped_input = false;
    let mut infile = None;
    let mut outfile = None;
    let mut appfile = None;

    let mut iter = tokens.into_iter();
    while let Some(token) = iter.next() {
        match token {
            Token::Word(w) => {
                let expanded = expand_vars(&w);
                // a word that expanded to nothing contributes no argument
                if !expanded.is_empty() {
                    argv.push(expanded);
                }
            }
            Token::Pipe => {
                if argv.is_empty() {
                    bail!("syntax error near `|'");
                }
                commands.push(ParsedCommand {
                    argv: std::mem::take(&mut argv),
                    piped_input,
                    piped_output: true,
                });
                piped_input = true;
            }
            Token::RedirIn | Token::RedirOut | Token::RedirApp => {
                let target = match iter.next() {
                    Some(Token::Word(w)) => expand_vars(&w),
                    _ => bail!("syntax error: missing redirect target"),
                };
                match token {
                    Token::RedirIn => infile = Some(target),
                    Token::RedirOut => outfile = Some(target),
                    Token::RedirApp => appfile = Some(target),
                    Token::Word(_) | Token::Pipe => unreachable!(),
                }
            }
        }
    }

    if argv.is_empty() {
        if !commands.is_empty() {
            bail!("syntax error near `|'");
        }
        // segment held only redirections; nothing to run
        return Ok(None);
    }
    commands.push(ParsedCommand {
        argv,
        piped_input,
        piped_output: false,
    });

    Ok(Some(ParsedPipeline {
        text: text.to_string(),
        commands,
        background,
        infile,
        outfile,
        appfile,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = tracing_subscriber::fmt::try_init();
    }

    #[test]
    fn test_simple_command() {
        init();
        let parsed = parse_line("ls -la /tmp").unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].commands.len(), 1);
        assert_eq!(parsed[0].commands[0].argv, vec!["ls", "-la", "/tmp"]);
        assert!(!parsed[0].background);
        assert!(!parsed[0].commands[0].piped_input);
        assert!(!parsed[0].commands[0].piped_output);
    }

    #[test]
    fn test_pipeline() {
        init();
        let parsed = parse_line("cat file | grep foo | wc -l").unwrap();
        assert_eq!(parsed.len(), 1);
        let commands = &parsed[0].commands;
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0].argv, vec!["cat", "file"]);
        assert!(!commands[0].piped_input);
        assert!(commands[0].piped_output);
        assert!(commands[1].piped_input);
        assert!(commands[1].piped_output);
        assert!(commands[2].piped_input);
        assert!(!commands[2].piped_output);
    }

    #[test]
    fn test_background_and_sequence() {
        init();
        let parsed = parse_line("sleep 10 & echo done; true").unwrap();
        assert_eq!(parsed.len(), 3);
        assert!(parsed[0].background);
        assert_eq!(parsed[0].text, "sleep 10");
        assert!(!parsed[1].background);
        assert_eq!(parsed[1].commands[0].argv, vec!["echo", "done"]);
        assert!(!parsed[2].background);

        // a pasted buffer of several lines runs them in order
        let parsed = parse_line("ls\npwd\n").unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].commands[0].argv, vec!["ls"]);
        assert_eq!(parsed[1].commands[0].argv, vec!["pwd"]);
    }

    #[test]
    fn test_redirections() {
        init();
        let parsed = parse_line("sort < in.txt > out.txt").unwrap();
        assert_eq!(parsed[0].infile.as_deref(), Some("in.txt"));
        assert_eq!(parsed[0].outfile.as_deref(), Some("out.txt"));
        assert_eq!(parsed[0].appfile, None);
        assert_eq!(parsed[0].commands[0].argv, vec!["sort"]);

        let parsed = parse_line("echo hi >> log.txt").unwrap();
        assert_eq!(parsed[0].appfile.as_deref(), Some("log.txt"));
        assert_eq!(parsed[0].outfile, None);
    }

    #[test]
    fn test_redirect_without_spaces() {
        init();
        let parsed = parse_line("wc -l<in>out").unwrap();
        assert_eq!(parsed[0].commands[0].argv, vec!["wc", "-l"]);
        assert_eq!(parsed[0].infile.as_deref(), Some("in"));
        assert_eq!(parsed[0].outfile.as_deref(), Some("out"));
    }

    #[test]
    fn test_syntax_errors() {
        init();
        assert!(parse_line("| wc").is_err());
        assert!(parse_line("ls |").is_err());
        assert!(parse_line("ls | | wc").is_err());
        assert!(parse_line("ls >").is_err());
        assert!(parse_line("ls > | wc").is_err());
    }

    #[test]
    fn test_empty_segments_are_skipped() {
        init();
        assert!(parse_line("").unwrap().is_empty());
        assert!(parse_line("   ;  ; ").unwrap().is_empty());
        let parsed = parse_line("; ls ;").unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_var_expansion() {
        init();
        unsafe { std::env::set_var("LSH_TEST_VAR", "expanded") };
        let parsed = parse_line("echo $LSH_TEST_VAR plain$").unwrap();
        assert_eq!(parsed[0].commands[0].argv, vec!["echo", "expanded", "plain$"]);

        let parsed = parse_line("echo $LSH_TEST_UNSET_VAR_ZZZ").unwrap();
        assert_eq!(parsed[0].commands[0].argv, vec!["echo"]);

        let parsed = parse_line("echo $$").unwrap();
        assert_eq!(
            parsed[0].commands[0].argv,
            vec!["echo".to_string(), std::process::id().to_string()]
        );
    }
}
