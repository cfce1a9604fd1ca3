use keel::{
    DataError, Driver, ErrorExt, Executor, Group, JoinedDist, JoinedPart, Record, Value, params,
};

#[derive(Default, Debug, Clone, PartialEq, Record)]
#[keel(table = "keel_author")]
pub struct Author {
    #[keel("author_id;primary")]
    pub id: i32,
    #[keel("name;length=~80")]
    pub name: String,
}

#[derive(Default, Debug, Clone, PartialEq, Record)]
#[keel(table = "keel_book")]
pub struct Book {
    #[keel("book_id;primary")]
    pub id: i32,
    #[keel("title")]
    pub title: String,
    #[keel("written_by;index=book_author,asc")]
    pub author: i32,
}

/// An author followed by the number of books, as a raw column.
#[derive(Default, Debug)]
struct AuthorStats {
    author: Author,
    extra: Vec<Value>,
}

impl JoinedDist for AuthorStats {
    fn part(&mut self, ordinal: usize) -> Option<JoinedPart<'_>> {
        match ordinal {
            0 => Some(JoinedPart::Record(&mut self.author)),
            1 => Some(JoinedPart::Columns(&mut self.extra, 1)),
            _ => None,
        }
    }
}

pub async fn joined<D: Driver>(group: &Group<D>) {
    group.drop_table::<Book>().await.expect("Failed to drop Book");
    group
        .drop_table::<Author>()
        .await
        .expect("Failed to drop Author");
    group
        .create_table::<Author>()
        .await
        .expect("Failed to create Author");
    group
        .create_table::<Book>()
        .await
        .expect("Failed to create Book");

    for (id, name) in [(1, "Italo Calvino"), (2, "Ursula K. Le Guin")] {
        group
            .execute(
                "INSERT INTO keel_author (author_id, name) VALUES (${author_id}, ${name})",
                &Author {
                    id,
                    name: name.into(),
                },
            )
            .await
            .expect("Could not insert an author");
    }
    let books = [
        (10, "Invisible Cities", 1),
        (11, "The Baron in the Trees", 1),
        (12, "The Dispossessed", 2),
    ];
    for (id, title, author) in books {
        group
            .execute(
                "INSERT INTO keel_book (book_id, title, written_by) VALUES (${book_id}, ${title}, ${written_by})",
                &Book {
                    id,
                    title: title.into(),
                    author,
                },
            )
            .await
            .expect("Could not insert a book");
    }

    let query = "SELECT a.author_id, a.name, b.book_id, b.title, b.written_by \
        FROM keel_author a JOIN keel_book b ON b.written_by = a.author_id \
        ORDER BY b.book_id";

    let mut first = (Author::default(), Book::default());
    group
        .fetch_one_joined(query, &(), &mut first)
        .await
        .expect("Could not fetch a joined row");
    assert_eq!(first.0.name, "Italo Calvino");
    assert_eq!(first.1.title, "Invisible Cities");

    let mut pairs: Vec<(Author, Book)> = Vec::with_capacity(books.len());
    group
        .fetch_many_joined(query, &(), &mut pairs)
        .await
        .expect("Could not fetch the joined rows");
    assert_eq!(pairs.len(), 3);
    for ((author, book), (id, title, author_id)) in pairs.iter().zip(books) {
        assert_eq!(book.id, id);
        assert_eq!(book.title, title);
        assert_eq!(author.id, author_id);
        assert_eq!(book.author, author.id);
    }

    let mut stats: Vec<Box<AuthorStats>> = Vec::new();
    group
        .fetch_many_joined(
            "SELECT a.author_id, a.name, COUNT(b.book_id) \
            FROM keel_author a LEFT JOIN keel_book b ON b.written_by = a.author_id \
            WHERE a.author_id >= ${from} \
            GROUP BY a.author_id, a.name ORDER BY a.author_id",
            &params!("from" => 1),
            &mut stats,
        )
        .await
        .expect("Could not fetch the author stats");
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].author.name, "Italo Calvino");
    assert_eq!(stats[0].extra, [Value::Int64(Some(2))]);
    assert_eq!(stats[1].extra, [Value::Int64(Some(1))]);

    // A column that belongs to no destination
    let mut pair = (Author::default(), Book::default());
    let error = group
        .fetch_one_joined(
            "SELECT a.author_id, a.name, 0 AS unknown FROM keel_author a",
            &(),
            &mut pair,
        )
        .await
        .expect_err("The column `unknown` is not a field of Book");
    assert_eq!(
        error.data_error(),
        Some(&DataError::BadColumn("unknown".into()))
    );
}
