use std::rc::Rc;

use weft_core::prelude::*;
use weft_devtools::{Inspector, dump_tree};

#[derive(Clone, Debug)]
enum Ui {
    Board {
        title: &'static str,
        columns: ReactiveVec<Ui>,
    },
    Column {
        name: &'static str,
        cards: ReactiveVec<Ui>,
    },
    Card {
        title: String,
        done: bool,
    },
    Status(String),
    Static(HeadlessNode),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum UiKind {
    Board,
    Column,
    Card,
    Status,
    Static,
}

impl Model for Ui {
    type Kind = UiKind;

    fn kind(&self) -> UiKind {
        match self {
            Ui::Board { .. } => UiKind::Board,
            Ui::Column { .. } => UiKind::Column,
            Ui::Card { .. } => UiKind::Card,
            Ui::Status(_) => UiKind::Status,
            Ui::Static(_) => UiKind::Static,
        }
    }
}

type Service = BindingService<Ui, HeadlessNode>;

fn card(title: &str) -> Ui {
    Ui::Card {
        title: title.to_string(),
        done: false,
    }
}

fn layout_binder(ui: &Ui, context: &Context<Ui>, service: &Service) -> anyhow::Result<HeadlessNode> {
    match ui {
        Ui::Board { title, columns } => {
            let node = HeadlessNode::new(*title);
            service.populate_children_reactive(context, &node, columns);
            Ok(node)
        }
        Ui::Column { name, cards } => {
            // The heading stays put; cards are tracked after it.
            let node = HeadlessNode::new(*name)
                .with_children([HeadlessNode::new(format!("== {name} =="))]);
            service.populate_children_reactive(context, &node, cards);
            Ok(node)
        }
        other => anyhow::bail!("layout binder cannot build {other:?}"),
    }
}

fn card_binder(ui: &Ui, context: &Context<Ui>, _: &Service) -> anyhow::Result<HeadlessNode> {
    let Ui::Card { title, done } = ui else {
        anyhow::bail!("card binder cannot build {ui:?}");
    };
    anyhow::ensure!(!title.is_empty(), "a card needs a title");

    let column = context.ancestor(|m| match m {
        Ui::Column { name, .. } => Some(*name),
        _ => None,
    })?;
    log::debug!("card '{title}' bound in {column}");
    {
        let title = title.clone();
        context.on_cancel(move || log::debug!("card '{title}' torn down"));
    }

    let mark = if *done { "x" } else { " " };
    Ok(HeadlessNode::new(format!("[{mark}] {title}")))
}

fn status_binder(ui: &Ui, _: &Context<Ui>, _: &Service) -> anyhow::Result<HeadlessNode> {
    match ui {
        Ui::Status(text) => Ok(HeadlessNode::new(format!("status: {text}"))),
        other => anyhow::bail!("status binder cannot build {other:?}"),
    }
}

fn print_window(title: &str, window: &HeadlessNode, inspector: &Inspector<Ui, HeadlessNode>) {
    println!("--- {title}");
    print!("{}", dump_tree(window));
    if let Some(line) = inspector.summary() {
        println!("{line}");
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let registry = Rc::new(BinderRegistry::new());
    let installer = BinderInstaller::new(registry.clone());
    installer.install(
        "layout",
        &[UiKind::Board, UiKind::Column],
        Rc::new(binder_fn("layout", layout_binder)),
    )?;
    installer.install("cards", &[UiKind::Card], Rc::new(binder_fn("card", card_binder)))?;
    installer.install(
        "status",
        &[UiKind::Status],
        Rc::new(binder_fn("status", status_binder)),
    )?;
    installer.install(
        "static",
        &[UiKind::Static],
        Rc::new(StaticBinder::new(|ui: &Ui| match ui {
            Ui::Static(node) => Some(node.clone()),
            _ => None,
        })),
    )?;
    log::info!("installed units: {:?}", installer.units());

    let inspector: Rc<Inspector<Ui, HeadlessNode>> = Rc::new(Inspector::new());
    let service = BindingService::with_config(
        registry,
        inspector.clone(),
        Diagnostics::default(),
        BindingConfig::new().trace_changes(true),
    );
    let root = Context::root(CancelToken::new(), Diagnostics::default());

    let todo = ReactiveVec::from_vec(vec![card("write docs"), card("fix flaky test")]);
    let doing = ReactiveVec::from_vec(vec![card("review parser")]);
    let done = ReactiveVec::new();
    let columns = ReactiveVec::from_vec(vec![
        Ui::Column {
            name: "todo",
            cards: todo.clone(),
        },
        Ui::Column {
            name: "doing",
            cards: doing.clone(),
        },
        Ui::Column {
            name: "done",
            cards: done.clone(),
        },
    ]);
    let status = signal(Ui::Status("loading".into()));

    let window = HeadlessNode::new("window");
    let status_bar = HeadlessNode::new("status bar");
    window.append(status_bar.clone());
    service.populate_child(&root, &window, &Ui::Static(HeadlessNode::new("weft todo board")));
    service.populate_child(
        &root,
        &window,
        &Ui::Board {
            title: "sprint 12",
            columns: columns.clone(),
        },
    );
    service.populate_child_stream(&root, &status_bar, &status);
    print_window("initial", &window, &inspector);

    todo.push(card("release 0.1"));
    todo.move_item(2, 0);
    let started = todo.remove(1);
    doing.push(started);
    done.push(Ui::Card {
        title: "set up CI".into(),
        done: true,
    });
    doing.replace(
        0,
        Ui::Card {
            title: "review parser (2nd pass)".into(),
            done: false,
        },
    );
    todo.push(card(""));
    status.set(Ui::Status(format!("{} cards open", todo.len() + doing.len())));
    print_window("after edits", &window, &inspector);

    done.clear();
    columns.push(Ui::Column {
        name: "blocked",
        cards: ReactiveVec::from_vec(vec![card("waiting on design")]),
    });
    print_window("after reset", &window, &inspector);

    root.cancel_token().cancel();
    println!("--- after cancel");
    print!("{}", dump_tree(&window));
    Ok(())
}
