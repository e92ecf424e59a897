#![allow(clippy::unwrap_used, clippy::expect_used)]

use zako_eval::{CommandNode, ExecContext, Executor, OpenMode, COMMAND_NOT_FOUND_STATUS};

use crate::common::{cmd, execute, leaf, Sandbox};

mod common;

fn append_line(sandbox: &Sandbox, text: &str) -> CommandNode {
    leaf(
        cmd("echo")
            .arg(text)
            .stdout(sandbox.file("log.txt").as_str(), OpenMode::Append),
    )
}

fn touch(sandbox: &Sandbox, name: &str) -> CommandNode {
    leaf(cmd("touch").arg(sandbox.file(name)))
}

#[test]
fn sequential_runs_every_leaf_in_order() {
    let sandbox = Sandbox::new("zako-seq");
    let tree = CommandNode::sequential(
        CommandNode::sequential(append_line(&sandbox, "a"), append_line(&sandbox, "b")),
        CommandNode::sequential(append_line(&sandbox, "c"), append_line(&sandbox, "d")),
    );
    assert!(execute(&tree).success());
    assert_eq!(sandbox.read("log.txt"), "a\nb\nc\nd\n");
}

#[test]
fn sequential_returns_right_result() {
    let _sandbox = Sandbox::new("zako-seq-result");
    let tree = CommandNode::sequential(leaf(cmd("true")), leaf(cmd("false")));
    assert!(!execute(&tree).success());
    let tree = CommandNode::sequential(leaf(cmd("false")), leaf(cmd("true")));
    assert!(execute(&tree).success());
}

#[test]
fn and_then_short_circuits_on_failure() {
    let sandbox = Sandbox::new("zako-and");
    let tree = CommandNode::and_then(leaf(cmd("false")), touch(&sandbox, "marker"));
    assert!(!execute(&tree).success());
    assert!(!sandbox.exists("marker"));

    let tree = CommandNode::and_then(leaf(cmd("true")), touch(&sandbox, "marker"));
    assert!(execute(&tree).success());
    assert!(sandbox.exists("marker"));
}

#[test]
fn or_else_short_circuits_on_success() {
    let sandbox = Sandbox::new("zako-or");
    let tree = CommandNode::or_else(leaf(cmd("true")), touch(&sandbox, "marker"));
    assert!(execute(&tree).success());
    assert!(!sandbox.exists("marker"));

    let tree = CommandNode::or_else(leaf(cmd("false")), touch(&sandbox, "marker"));
    assert!(execute(&tree).success());
    assert!(sandbox.exists("marker"));
}

#[test]
fn and_then_keeps_left_status() {
    let _sandbox = Sandbox::new("zako-and-status");
    let tree = CommandNode::and_then(
        leaf(cmd("sh").arg("-c").arg("exit 3")),
        leaf(cmd("true")),
    );
    assert_eq!(execute(&tree).status(), 3);
}

#[test]
fn parallel_branches_run_concurrently() {
    let sandbox = Sandbox::new("zako-par");
    // 左侧先睡一会儿，再确认右侧已经写过标记
    let slow = CommandNode::sequential(
        leaf(cmd("sleep").arg("0.5")),
        CommandNode::and_then(
            leaf(cmd("test").arg("-e").arg(sandbox.file("fast"))),
            touch(&sandbox, "seen"),
        ),
    );
    let tree = CommandNode::parallel(slow, touch(&sandbox, "fast"));
    assert!(execute(&tree).success());
    assert!(sandbox.exists("fast"));
    assert!(sandbox.exists("seen"));
}

#[test]
fn parallel_ignores_exit_codes() {
    let _sandbox = Sandbox::new("zako-par-codes");
    let tree = CommandNode::parallel(leaf(cmd("false")), leaf(cmd("sh").arg("-c").arg("exit 7")));
    assert!(execute(&tree).success());
}

#[test]
fn parallel_signal_is_failure() {
    let sandbox = Sandbox::new("zako-par-signal");
    // 杀掉的是分支进程本身（sh 的父进程），不是 sh
    let tree = CommandNode::parallel(
        leaf(cmd("sh").arg("-c").arg("kill -9 $PPID")),
        touch(&sandbox, "other"),
    );
    assert!(!execute(&tree).success());
    assert!(sandbox.exists("other"));
}

#[test]
fn pipe_passes_output_through() {
    let sandbox = Sandbox::new("zako-pipe");
    let tree = CommandNode::pipe(
        leaf(cmd("echo").arg("hello world")),
        leaf(cmd("cat").stdout(sandbox.file("out.txt").as_str(), OpenMode::Truncate)),
    );
    assert!(execute(&tree).success());
    assert_eq!(sandbox.read("out.txt"), "hello world\n");
}

#[test]
fn pipe_reports_right_status() {
    let _sandbox = Sandbox::new("zako-pipe-status");
    let tree = CommandNode::pipe(leaf(cmd("true")), leaf(cmd("false")));
    assert!(!execute(&tree).success());

    let tree = CommandNode::pipe(leaf(cmd("false")), leaf(cmd("true")));
    assert!(execute(&tree).success());

    let tree = CommandNode::pipe(
        leaf(cmd("true")),
        leaf(cmd("sh").arg("-c").arg("exit 5")),
    );
    assert_eq!(execute(&tree).status(), 5);
}

#[test]
fn three_stage_pipeline() {
    let sandbox = Sandbox::new("zako-pipe3");
    let tree = CommandNode::pipe(
        leaf(cmd("printf").arg("b\\na\\nc\\n")),
        CommandNode::pipe(
            leaf(cmd("sort")),
            leaf(cmd("cat").stdout(sandbox.file("out.txt").as_str(), OpenMode::Truncate)),
        ),
    );
    assert!(execute(&tree).success());
    assert_eq!(sandbox.read("out.txt"), "a\nb\nc\n");
}

#[test]
fn pipe_reader_sees_eof() {
    let sandbox = Sandbox::new("zako-pipe-eof");
    // wc 只有在写端全部关闭后才会结束
    let tree = CommandNode::pipe(
        CommandNode::sequential(
            leaf(cmd("echo").arg("one")),
            leaf(cmd("echo").arg("two")),
        ),
        leaf(cmd("wc").arg("-l").stdout(sandbox.file("count.txt").as_str(), OpenMode::Truncate)),
    );
    assert!(execute(&tree).success());
    assert_eq!(sandbox.read("count.txt").trim(), "2");
}

#[test]
fn pipe_reader_sees_eof_when_writer_redirects_away() {
    let sandbox = Sandbox::new("zako-pipe-early-eof");
    // 左侧把 stdout 换成了别的文件，右侧的 cat 应该立刻读到 EOF
    let writer_script = format!(
        "sleep 1; test -e {} && touch {}",
        sandbox.file("eof"),
        sandbox.file("early")
    );
    let tree = CommandNode::pipe(
        leaf(
            cmd("sh")
                .arg("-c")
                .arg(writer_script.as_str())
                .stdout("/dev/null", OpenMode::Truncate),
        ),
        leaf(
            cmd("sh")
                .arg("-c")
                .arg(format!("cat > /dev/null; touch {}", sandbox.file("eof")).as_str()),
        ),
    );
    assert!(execute(&tree).success());
    assert!(sandbox.exists("eof"));
    assert!(sandbox.exists("early"));
}

#[test]
fn pipe_branch_inherits_no_extra_descriptors() {
    let sandbox = Sandbox::new("zako-pipe-fds");
    let list_fds = |name: &str| {
        leaf(
            cmd("sh")
                .arg("-c")
                .arg("ls /proc/$$/fd")
                .stdout(sandbox.file(name).as_str(), OpenMode::Truncate),
        )
    };

    assert!(execute(&list_fds("plain.txt")).success());
    let tree = CommandNode::pipe(list_fds("piped.txt"), leaf(cmd("true")));
    assert!(execute(&tree).success());

    let plain = sandbox.read("plain.txt");
    let piped = sandbox.read("piped.txt");
    // 管道分支里跑的程序和直接运行时看到的描述符一样
    assert_eq!(plain, piped);
}

#[test]
fn missing_program_reports_not_found() {
    let sandbox = Sandbox::new("zako-missing");
    let tree = leaf(
        cmd("zako-eval-no-such-program")
            .stderr(sandbox.file("err.txt").as_str(), OpenMode::Truncate),
    );
    let result = execute(&tree);
    assert!(!result.success());
    assert_eq!(result.status(), COMMAND_NOT_FOUND_STATUS);
    assert!(sandbox.read("err.txt").contains("command not found"));
}

#[test]
fn nonzero_exit_is_failure_with_status() {
    let _sandbox = Sandbox::new("zako-exit-code");
    let result = execute(&leaf(cmd("sh").arg("-c").arg("exit 42")));
    assert!(!result.success());
    assert_eq!(result.status(), 42);
}

#[test]
fn run_returns_process_status() {
    let _sandbox = Sandbox::new("zako-run");
    let mut executor = Executor::with_context(ExecContext::default());
    assert_eq!(executor.run(&leaf(cmd("true"))), 0);
    assert_eq!(executor.run(&leaf(cmd("sh").arg("-c").arg("exit 9"))), 9);
}
