// End-to-end checks of the fork/exec path through the non-interactive
// reconciler. Everything forking lives in this single test so no other
// thread in this process ever races the registry's waitpid calls.

use lsh::environment::Environment;
use lsh::shell::Shell;
use lsh_types::Context;
use std::fs;
use std::time::Duration;

fn make_shell() -> (Shell, Context) {
    let shell = Shell::new(Environment::new());
    let ctx = Context::new(shell.pid, shell.pgid, None, false);
    (shell, ctx)
}

#[test]
fn external_pipelines_and_redirections() {
    let (mut shell, mut ctx) = make_shell();
    let dir = tempfile::tempdir().unwrap();

    // false | true: both stages end completed, the job is removed exactly
    // once, no notice is due (normal exits), and the pipeline reports the
    // last stage's successful exit.
    let status = shell
        .eval_str(&mut ctx, "false | true".to_string())
        .unwrap();
    assert_eq!(status.code(), 0);
    assert_eq!(shell.job_count(), 0);

    // a failing single command reports its own exit code
    let status = shell.eval_str(&mut ctx, "false".to_string()).unwrap();
    assert_eq!(status.code(), 1);
    assert_eq!(shell.job_count(), 0);

    // output redirection
    let out = dir.path().join("out.txt");
    let status = shell
        .eval_str(&mut ctx, format!("echo hello > {}", out.display()))
        .unwrap();
    assert_eq!(status.code(), 0);
    assert_eq!(fs::read_to_string(&out).unwrap(), "hello\n");

    // append redirection
    shell
        .eval_str(&mut ctx, format!("echo world >> {}", out.display()))
        .unwrap();
    assert_eq!(fs::read_to_string(&out).unwrap(), "hello\nworld\n");

    // input redirection
    let input = dir.path().join("in.txt");
    fs::write(&input, "alpha\n").unwrap();
    let copy = dir.path().join("copy.txt");
    let status = shell
        .eval_str(
            &mut ctx,
            format!("cat < {} > {}", input.display(), copy.display()),
        )
        .unwrap();
    assert_eq!(status.code(), 0);
    assert_eq!(fs::read_to_string(&copy).unwrap(), "alpha\n");

    // a missing input file fails the command, not the shell
    let status = shell
        .eval_str(&mut ctx, "cat < /nonexistent/definitely/missing".to_string())
        .unwrap();
    assert_eq!(status.code(), 1);
    assert_eq!(shell.job_count(), 0);

    // a background job stays tracked until a notification pass reaps it
    let status = shell
        .eval_str(&mut ctx, "sleep 0.2 &".to_string())
        .unwrap();
    assert_eq!(status.code(), 0);
    assert_eq!(shell.job_count(), 1);
    for _ in 0..100 {
        std::thread::sleep(Duration::from_millis(50));
        shell.notify_jobs(None, false);
        if shell.job_count() == 0 {
            break;
        }
    }
    assert_eq!(shell.job_count(), 0);

    // unknown commands fail in the child; the shell keeps going
    let status = shell
        .eval_str(&mut ctx, "definitely-not-a-command-zzz".to_string())
        .unwrap();
    assert_eq!(status.code(), 127);
    assert_eq!(shell.job_count(), 0);

    // sequencing: the last segment's status wins
    let status = shell
        .eval_str(&mut ctx, "false; true".to_string())
        .unwrap();
    assert_eq!(status.code(), 0);
}
