use anyhow::Context;
use blog_client::{BlogClient, PostDetail, PostForm, PostList};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "blog-cli", about = "Command-line client for the blog server")]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the saved token.
    Logout,
    List {
        #[arg(long)]
        page: Option<u32>,
    },
    Show {
        id: i64,
    },
    /// Posts in a category; `_none` lists the uncategorized ones.
    Category {
        slug: String,
        #[arg(long)]
        page: Option<u32>,
    },
    Tag {
        slug: String,
        #[arg(long)]
        page: Option<u32>,
    },
    Search {
        term: String,
        #[arg(long)]
        page: Option<u32>,
    },
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        #[arg(long)]
        head_image: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Tag names separated by `,` or `;`.
        #[arg(long)]
        tags: Option<String>,
    },
    /// Update a post; fields left out keep their current values.
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        head_image: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        tags: Option<String>,
    },
    Delete {
        id: i64,
    },
    Comment {
        post_id: i64,
        #[arg(long)]
        text: String,
    },
    EditComment {
        id: i64,
        #[arg(long)]
        text: String,
    },
    DeleteComment {
        id: i64,
    },
}

fn print_list(list: &PostList) {
    println!("{}", list.heading);
    if let Some(category) = &list.category {
        println!("Category: {}", category.label);
    }
    if let Some(tag) = &list.tag {
        println!("Tag: #{}", tag.name);
    }
    if let Some(info) = &list.search_info {
        println!("{info}");
    }
    for post in &list.posts {
        let category = post
            .category
            .as_ref()
            .map(|c| c.name.as_str())
            .unwrap_or("Uncategorized");
        println!(
            "- [{}] {} ({}, by {}, {})",
            post.id,
            post.title,
            category,
            post.author.username,
            post.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    if list.page.is_paginated {
        println!("Page {} of {}", list.page.number, list.page.num_pages);
    }
}

fn print_detail(detail: &PostDetail) {
    let post = &detail.post;
    println!("[{}] {}", post.id, post.title);
    println!(
        "by {} on {}",
        post.author.username,
        post.created_at.format("%Y-%m-%d %H:%M")
    );
    if let Some(category) = &post.category {
        println!("Category: {}", category.name);
    }
    if !post.tags.is_empty() {
        let tags: Vec<String> = post.tags.iter().map(|t| format!("#{}", t.name)).collect();
        println!("Tags: {}", tags.join(" "));
    }
    println!();
    println!("{}", post.content);
    println!();
    println!("Comments ({})", detail.comments.len());
    for comment in &detail.comments {
        let mine = if comment.can_edit { " *" } else { "" };
        println!(
            "- [{}] {}: {}{}",
            comment.id, comment.author.username, comment.text, mine
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    let mut client = BlogClient::connect(&args.server).context("failed to create client")?;

    match args.command {
        Command::Register { username, password } => {
            client.register(&username, &password).await?;
            println!("Successfully registered!");
        }
        Command::Login { username, password } => {
            client.login(&username, &password).await?;
            println!("Successfully logged in!");
        }
        Command::Logout => {
            client.logout()?;
            println!("Logged out.");
        }
        Command::List { page } => print_list(&client.list_posts(page).await?),
        Command::Show { id } => print_detail(&client.get_post(id).await?),
        Command::Category { slug, page } => {
            print_list(&client.category_posts(&slug, page).await?)
        }
        Command::Tag { slug, page } => print_list(&client.tag_posts(&slug, page).await?),
        Command::Search { term, page } => print_list(&client.search_posts(&term, page).await?),
        Command::Create {
            title,
            content,
            head_image,
            category,
            tags,
        } => {
            let form = PostForm {
                title,
                content,
                head_image,
                category,
                tags_str: tags,
            };
            let detail = client.create_post(&form).await?;
            println!("Post created! ID: {}", detail.post.id);
        }
        Command::Update {
            id,
            title,
            content,
            head_image,
            category,
            tags,
        } => {
            let current = client.update_form(id).await?.form;
            let form = PostForm {
                title: title.unwrap_or(current.title),
                content: content.unwrap_or(current.content),
                head_image: head_image.or(current.head_image),
                category: category.or(current.category),
                tags_str: tags.or(current.tags_str),
            };
            let detail = client.update_post(id, &form).await?;
            println!("Post updated:");
            print_detail(&detail);
        }
        Command::Delete { id } => {
            client.delete_post(id).await?;
            println!("Post deleted!");
        }
        Command::Comment { post_id, text } => {
            let detail = client.new_comment(post_id, &text).await?;
            println!("Comment added to post {}", detail.post.id);
        }
        Command::EditComment { id, text } => {
            client.edit_comment(id, &text).await?;
            println!("Comment updated!");
        }
        Command::DeleteComment { id } => {
            client.delete_comment(id).await?;
            println!("Comment deleted!");
        }
    }

    Ok(())
}
