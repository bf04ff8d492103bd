//! Interactive command loop for the table admin tool.

use dialoguer::{Confirm, Input, Select};
use serde_json::Value;
use tracing::warn;

use super::catalog::{Item, TableCatalog};
use super::error::Result;
use super::session::{Selection, Session};
use crate::dynamo::Capacity;

const MENU: &str = "명령어를 입력해주세요 (g: 테이블 선택, l: 테이블 목록, c: 테이블 생성, \
s: 전체 조회, p: 항목 삽입, r: 항목 조회, u: 항목 업데이트, di: 항목 삭제, dt: 테이블 삭제, q: 종료)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Select,
    List,
    Create,
    Scan,
    Put,
    Get,
    Update,
    DeleteItem,
    DeleteTable,
    Quit,
}

impl Command {
    pub fn parse(input: &str) -> Option<Self> {
        let cmd = match input.trim().to_ascii_lowercase().as_str() {
            "g" => Command::Select,
            "l" => Command::List,
            "c" => Command::Create,
            "s" => Command::Scan,
            "p" => Command::Put,
            "r" => Command::Get,
            "u" => Command::Update,
            "di" => Command::DeleteItem,
            "dt" => Command::DeleteTable,
            "q" => Command::Quit,
            _ => return None,
        };
        Some(cmd)
    }
}

/// Runs until `q` or until stdin closes. Command failures are printed and never end the loop.
pub async fn run(catalog: &dyn TableCatalog) -> anyhow::Result<()> {
    let mut session = Session::default();

    loop {
        let prompt = match session.selected() {
            Some(table) => format!("[{}] {}", table.name, MENU),
            None => MENU.to_string(),
        };
        let input: String = match Input::new().with_prompt(prompt).interact_text() {
            Ok(input) => input,
            Err(e) => {
                warn!(error = %e, "prompt closed");
                break;
            }
        };

        let Some(command) = Command::parse(&input) else {
            println!("잘못된 명령어입니다.");
            continue;
        };
        if command == Command::Quit {
            println!("프로그램을 종료합니다.");
            break;
        }

        if let Err(e) = execute(command, &mut session, catalog).await {
            println!("{}", e);
        }
    }

    Ok(())
}

async fn execute(command: Command, session: &mut Session, catalog: &dyn TableCatalog) -> Result<()> {
    match command {
        Command::Select => {
            let name = ask("테이블 이름을 입력해주세요")?;
            match session
                .select_or_create(catalog, &name, || ask("기본 키 이름을 입력해주세요"))
                .await?
            {
                Selection::Existing => println!("'{}' 테이블을 선택했습니다.", name.trim()),
                Selection::Created => {
                    println!("'{}' 테이블을 생성하고 선택했습니다.", name.trim())
                }
            }
            if let Some(table) = session.selected() {
                println!("기본 키: {}", table.primary_key);
            }
        }
        Command::List => {
            let names = catalog.list_tables().await?;
            if names.is_empty() {
                println!("테이블이 없습니다.");
            }
            for name in names {
                println!("- {}", name);
            }
        }
        Command::Create => {
            let name = ask("테이블 이름을 입력해주세요")?;
            let key = ask("기본 키 이름을 입력해주세요")?;
            let capacity = ask_capacity()?;
            session.create(catalog, &name, &key, capacity).await?;
            println!("'{}' 테이블을 생성하고 선택했습니다.", name.trim());
        }
        Command::Scan => {
            let items = session.scan(catalog).await?;
            println!("{}", render_items(&items));
            println!("총 {}개의 항목", items.len());
        }
        Command::Put => {
            let key = ask("항목 키 값을 입력해주세요")?;
            let mut attributes = Vec::new();
            loop {
                let name = ask_optional("속성 이름을 입력해주세요 (빈 값이면 완료)")?;
                if name.is_empty() {
                    break;
                }
                let value = ask("속성 값을 입력해주세요")?;
                attributes.push((name, value));
            }
            session.put(catalog, &key, &attributes).await?;
            println!("항목을 저장했습니다.");
        }
        Command::Get => {
            let key = ask("조회할 항목 키 값을 입력해주세요")?;
            let item = session.get(catalog, &key).await?;
            println!("{}", render_item(&item));
        }
        Command::Update => {
            let key = ask("업데이트할 항목 키 값을 입력해주세요")?;
            let attribute = ask("업데이트할 속성 이름을 입력해주세요")?;
            let value = ask("새로운 값을 입력해주세요")?;
            session.update(catalog, &key, &attribute, &value).await?;
            println!("항목을 업데이트했습니다.");
        }
        Command::DeleteItem => {
            let key = ask("삭제할 항목 키 값을 입력해주세요")?;
            session.delete_item(catalog, &key).await?;
            println!("항목을 삭제했습니다.");
        }
        Command::DeleteTable => {
            let name = session.table_to_delete()?.to_string();
            let confirmed = Confirm::new()
                .with_prompt(format!(
                    "'{}' 테이블을 삭제하시겠습니까? 모든 데이터가 삭제됩니다",
                    name
                ))
                .default(false)
                .interact()?;
            if !confirmed {
                println!("테이블 삭제를 취소했습니다.");
                return Ok(());
            }
            session.delete_table(catalog).await?;
            println!("'{}' 테이블을 삭제했습니다.", name);
        }
        Command::Quit => {}
    }
    Ok(())
}

fn ask(prompt: &str) -> Result<String> {
    Ok(Input::<String>::new().with_prompt(prompt).interact_text()?)
}

fn ask_optional(prompt: &str) -> Result<String> {
    let value: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;
    Ok(value.trim().to_string())
}

fn ask_capacity() -> Result<Capacity> {
    let choice = Select::new()
        .with_prompt("용량 모드를 선택해주세요")
        .items(&["프로비저닝 (읽기 5 / 쓰기 5)", "온디맨드"])
        .default(0)
        .interact()?;
    Ok(match choice {
        0 => Capacity::default(),
        _ => Capacity::OnDemand,
    })
}

pub fn render_item(item: &Item) -> String {
    serde_json::to_string_pretty(&Value::Object(item.clone())).unwrap_or_default()
}

pub fn render_items(items: &[Item]) -> String {
    let array = Value::Array(items.iter().cloned().map(Value::Object).collect());
    serde_json::to_string_pretty(&array).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_command_code() {
        let cases = [
            ("g", Command::Select),
            ("l", Command::List),
            ("c", Command::Create),
            ("s", Command::Scan),
            ("p", Command::Put),
            ("r", Command::Get),
            ("u", Command::Update),
            ("di", Command::DeleteItem),
            ("dt", Command::DeleteTable),
            ("q", Command::Quit),
        ];
        for (code, expected) in cases {
            assert_eq!(Command::parse(code), Some(expected), "code {code}");
        }
        assert_eq!(Command::parse(" DT "), Some(Command::DeleteTable));
    }

    #[test]
    fn unknown_codes_are_rejected() {
        for code in ["", "d", "x", "delete", "gg"] {
            assert_eq!(Command::parse(code), None, "code {code:?}");
        }
    }

    #[test]
    fn items_render_as_pretty_json() {
        let mut item = Item::new();
        item.insert("id".into(), Value::String("p1".into()));
        let out = render_items(&[item.clone()]);
        assert!(out.starts_with('['));
        assert!(out.contains("\"id\": \"p1\""));
        assert_eq!(render_item(&item), "{\n  \"id\": \"p1\"\n}");
    }
}
