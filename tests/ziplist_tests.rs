use kvcore::{
    database::ziplist::{Encoding, HEADER_SIZE},
    StatusCode, Where, ZipList, ZipListError, ZipValue, ZipValueOwned,
};
use rstest::rstest;

fn values(zl: &ZipList) -> Vec<ZipValueOwned> {
    zl.iter().map(ZipValueOwned::from).collect()
}

/// Проверяет, что поле prevlen каждого элемента равно длине предыдущего.
fn assert_prevlen_chain(zl: &ZipList) {
    let mut p = zl.head_offset();
    let mut prev_len = 0;
    while let Some(e) = zl.entry_at(p) {
        assert_eq!(e.prevrawlen, prev_len, "stale prevlen at offset {p}");
        prev_len = e.total_len();
        p += e.total_len();
    }
    assert_eq!(p, zl.end_offset());
}

/// Тест проверяет сценарий: строка "abc", затем 12 в голову, затем удаление
/// головы.
#[test]
fn test_abc_then_immediate_twelve() {
    let mut zl = ZipList::new();

    zl.push(b"abc", Where::Tail).unwrap();
    assert_eq!(zl.len(), 1);
    let p = zl.index(0).unwrap();
    assert_eq!(zl.get(p), Some(ZipValue::Str(b"abc")));

    zl.push(b"12", Where::Head).unwrap();
    assert_eq!(zl.len(), 2);
    let p = zl.index(0).unwrap();
    assert_eq!(zl.get(p), Some(ZipValue::Int(12)));

    // 4-битное значение: только prevlen и тег, без полезной нагрузки.
    let e = zl.entry_at(p).unwrap();
    assert_eq!(e.encoding, Encoding::Imm(12));
    assert_eq!(e.len, 0);
    assert_eq!(e.total_len(), 2);

    zl.delete_range(0, 1).unwrap();
    assert_eq!(values(&zl), vec![ZipValueOwned::Str(b"abc".to_vec())]);
    assert_prevlen_chain(&zl);
    zl.validate().unwrap();
}

/// Тест проверяет граничные целые: значение сохраняется и выбирается
/// наименьшая кодировка.
#[rstest]
#[case(0, Encoding::Imm(0))]
#[case(12, Encoding::Imm(12))]
#[case(13, Encoding::Int8)]
#[case(-1, Encoding::Int8)]
#[case(127, Encoding::Int8)]
#[case(128, Encoding::Int16)]
#[case(-128, Encoding::Int8)]
#[case(32767, Encoding::Int16)]
#[case(32768, Encoding::Int24)]
#[case(8388607, Encoding::Int24)]
#[case(8388608, Encoding::Int32)]
#[case(2147483647, Encoding::Int32)]
#[case(2147483648, Encoding::Int64)]
#[case(i64::MIN, Encoding::Int64)]
fn test_integer_boundaries(
    #[case] value: i64,
    #[case] encoding: Encoding,
) {
    let mut zl = ZipList::new();
    zl.push(b"head", Where::Tail).unwrap();
    zl.push(value.to_string().as_bytes(), Where::Tail).unwrap();
    zl.push(b"tail", Where::Tail).unwrap();

    let p = zl.index(1).unwrap();
    assert_eq!(zl.get(p), Some(ZipValue::Int(value)));

    let e = zl.entry_at(p).unwrap();
    assert_eq!(e.encoding, encoding);
    assert_eq!(e.len, encoding.int_size());

    assert!(zl.compare(p, value.to_string().as_bytes()));
    assert_eq!(zl.find(zl.head_offset(), value.to_string().as_bytes(), 0), Some(p));
    zl.validate().unwrap();
}

/// Тест проверяет, что нечисловые и неканонические строки остаются
/// строками.
#[rstest]
#[case(b"")]
#[case(b"+1")]
#[case(b"01")]
#[case(b" 1")]
#[case(b"1.5")]
#[case(b"9223372036854775808")]
#[case(b"-")]
fn test_non_integer_strings_stay_strings(#[case] s: &[u8]) {
    let mut zl = ZipList::new();
    zl.push(s, Where::Tail).unwrap();

    let p = zl.index(0).unwrap();
    assert_eq!(zl.get(p), Some(ZipValue::Str(s)));
}

/// Тест проверяет строки с заголовками длины 1, 2 и 5 байт.
#[rstest]
#[case(63, 1)]
#[case(64, 2)]
#[case(16383, 2)]
#[case(16384, 5)]
fn test_string_length_headers(
    #[case] len: usize,
    #[case] lensize: usize,
) {
    let s = vec![b'x'; len];
    let mut zl = ZipList::new();
    zl.push(b"first", Where::Tail).unwrap();
    zl.push(&s, Where::Tail).unwrap();
    zl.push(b"last", Where::Tail).unwrap();

    let p = zl.index(1).unwrap();
    let e = zl.entry_at(p).unwrap();
    assert_eq!(e.lensize, lensize);
    assert_eq!(e.len, len);
    assert_eq!(zl.get(p), Some(ZipValue::Str(&s)));

    // Следующий элемент хранит длину в 5-байтовом поле, если она >= 254.
    let next = zl.entry_at(zl.next(p).unwrap()).unwrap();
    assert_eq!(next.prevrawlensize, if e.total_len() >= 254 { 5 } else { 1 });
    assert_prevlen_chain(&zl);
}

/// Тест проверяет каскадное обновление: вставка длинного элемента в голову
/// расширяет поле prevlen у всей цепочки элементов длиной 253 байта.
#[test]
fn test_cascade_update_on_insert() {
    let mut zl = ZipList::new();
    let chunk = vec![b'a'; 250];
    for _ in 0..6 {
        zl.push(&chunk, Where::Tail).unwrap();
    }
    for p in [zl.index(1).unwrap(), zl.index(5).unwrap()] {
        assert_eq!(zl.entry_at(p).unwrap().prevrawlensize, 1);
    }

    let big = vec![b'b'; 300];
    zl.push(&big, Where::Head).unwrap();

    assert_eq!(zl.len(), 7);
    for i in 1..7 {
        let e = zl.entry_at(zl.index(i).unwrap()).unwrap();
        assert_eq!(e.prevrawlensize, 5, "entry {i}");
    }
    assert_prevlen_chain(&zl);
    zl.validate().unwrap();

    let tail = zl.index(-1).unwrap();
    assert_eq!(zl.tail_offset(), tail);
    assert_eq!(zl.get(tail), Some(ZipValue::Str(&chunk)));
}

/// Тест проверяет, что вставка короткого элемента перед элементом с
/// 5-байтовым полем prevlen не сужает это поле.
#[test]
fn test_insert_never_shrinks_prevlen() {
    let mut zl = ZipList::new();
    zl.push(&vec![b'x'; 300], Where::Tail).unwrap();
    zl.push(b"after", Where::Tail).unwrap();

    let after = zl.index(1).unwrap();
    assert_eq!(zl.entry_at(after).unwrap().prevrawlensize, 5);

    // Новый элемент (5 + 1 + 1 байт) короче 254, но поле остаётся 5 байт.
    zl.insert(after, b"s").unwrap();
    let after = zl.index(2).unwrap();
    let e = zl.entry_at(after).unwrap();
    assert_eq!(e.prevrawlensize, 5);
    assert_eq!(e.prevrawlen, 7);
    assert_eq!(zl.get(after), Some(ZipValue::Str(b"after")));
    assert_prevlen_chain(&zl);
    zl.validate().unwrap();
}

/// Тест проверяет удаление из середины с восстановлением цепочки prevlen.
#[test]
fn test_delete_middle_repairs_prevlen() {
    let mut zl = ZipList::new();
    zl.push(b"a", Where::Tail).unwrap();
    zl.push(&vec![b'm'; 400], Where::Tail).unwrap();
    zl.push(b"b", Where::Tail).unwrap();
    zl.push(b"c", Where::Tail).unwrap();

    let p = zl.index(1).unwrap();
    let next = zl.delete(p).unwrap();
    assert_eq!(zl.get(next), Some(ZipValue::Str(b"b")));

    assert_eq!(
        values(&zl),
        vec![
            ZipValueOwned::Str(b"a".to_vec()),
            ZipValueOwned::Str(b"b".to_vec()),
            ZipValueOwned::Str(b"c".to_vec()),
        ]
    );
    assert_prevlen_chain(&zl);
    zl.validate().unwrap();
}

/// Тест проверяет удаление диапазона, в том числе до конца списка.
#[test]
fn test_delete_range() {
    let mut zl = ZipList::new();
    for i in 0..10 {
        zl.push(i.to_string().as_bytes(), Where::Tail).unwrap();
    }

    zl.delete_range(2, 3).unwrap();
    assert_eq!(zl.len(), 7);
    zl.delete_range(-2, 100).unwrap();
    assert_eq!(zl.len(), 5);
    zl.delete_range(50, 1).unwrap();
    assert_eq!(zl.len(), 5);

    let ints: Vec<i64> = zl.iter().filter_map(|v| v.as_int()).collect();
    assert_eq!(ints, vec![0, 1, 5, 6, 7]);
    assert_eq!(zl.tail_offset(), zl.index(-1).unwrap());
    zl.validate().unwrap();
}

/// Тест проверяет навигацию `index`/`next`/`prev`.
#[test]
fn test_navigation() {
    let mut zl = ZipList::new();
    assert_eq!(zl.index(0), None);
    assert_eq!(zl.index(-1), None);
    assert_eq!(zl.prev(zl.end_offset()), None);

    for s in [&b"one"[..], b"2", b"three"] {
        zl.push(s, Where::Tail).unwrap();
    }

    let first = zl.index(0).unwrap();
    assert_eq!(first, HEADER_SIZE);
    assert_eq!(zl.prev(first), None);

    let second = zl.next(first).unwrap();
    assert_eq!(zl.index(1), Some(second));
    assert_eq!(zl.index(-2), Some(second));
    assert_eq!(zl.prev(second), Some(first));

    let third = zl.next(second).unwrap();
    assert_eq!(zl.next(third), None);
    assert_eq!(zl.prev(zl.end_offset()), Some(third));
    assert_eq!(zl.index(3), None);
    assert_eq!(zl.index(-4), None);
}

/// Тест проверяет `find` с пропуском: поиск только по ключам пар.
#[test]
fn test_find_with_skip() {
    let mut zl = ZipList::new();
    for s in [&b"name"[..], b"value", b"age", b"42", b"42", b"x"] {
        zl.push(s, Where::Tail).unwrap();
    }

    let head = zl.head_offset();
    // Ключи стоят на чётных позициях.
    let p = zl.find(head, b"42", 1).unwrap();
    assert_eq!(Some(p), zl.index(4));
    assert_eq!(zl.find(head, b"value", 1), None);
    assert_eq!(zl.find(head, b"value", 0), zl.index(1));
    assert_eq!(zl.find(head, b"missing", 0), None);
}

/// Тест проверяет `pop` с обоих концов.
#[test]
fn test_pop_both_ends() {
    let mut zl = ZipList::new();
    assert_eq!(zl.pop(Where::Head).unwrap(), None);

    zl.push(b"left", Where::Tail).unwrap();
    zl.push(b"100", Where::Tail).unwrap();
    zl.push(b"right", Where::Tail).unwrap();

    assert_eq!(
        zl.pop(Where::Tail).unwrap(),
        Some(ZipValueOwned::Str(b"right".to_vec()))
    );
    assert_eq!(
        zl.pop(Where::Head).unwrap(),
        Some(ZipValueOwned::Str(b"left".to_vec()))
    );
    assert_eq!(zl.pop(Where::Head).unwrap(), Some(ZipValueOwned::Int(100)));
    assert!(zl.is_empty());
    assert_eq!(zl.blob_len(), HEADER_SIZE + 1);
}

/// Тест проверяет сериализацию по сырым байтам и отказ от повреждённых
/// буферов.
#[test]
fn test_from_bytes_round_trip_and_corruption() {
    let mut zl = ZipList::new();
    for s in [&b"alpha"[..], b"-7", &vec![b'z'; 300]] {
        zl.push(s, Where::Tail).unwrap();
    }

    let restored = ZipList::from_bytes(zl.as_bytes().to_vec()).unwrap();
    assert_eq!(restored, zl);

    let mut bad = zl.clone().into_bytes();
    bad[HEADER_SIZE] = 0x07;
    let err = ZipList::from_bytes(bad).unwrap_err();
    assert!(matches!(err, ZipListError::Corrupted { offset, .. } if offset == HEADER_SIZE));

    let mut truncated = zl.into_bytes();
    truncated.truncate(20);
    let err = ZipList::from_bytes(truncated).unwrap_err();
    assert!(matches!(err, ZipListError::Corrupted { .. }));
    assert_eq!(
        kvcore::ErrorExt::status_code(&err),
        StatusCode::CorruptedData
    );
}

/// Тест проверяет насыщенный счётчик: длина считается обходом, а после
/// удаления счётчик можно восстановить.
#[test]
fn test_saturated_length_counter() {
    let count = u16::MAX as usize + 5;

    // Буфер из одинаковых элементов [prevlen, 0xF1] собирается вручную.
    let total = HEADER_SIZE + count * 2 + 1;
    let mut data = Vec::with_capacity(total);
    data.extend_from_slice(&(total as u32).to_le_bytes());
    data.extend_from_slice(&((HEADER_SIZE + (count - 1) * 2) as u32).to_le_bytes());
    data.extend_from_slice(&u16::MAX.to_le_bytes());
    for i in 0..count {
        data.push(if i == 0 { 0 } else { 2 });
        data.push(0xF1);
    }
    data.push(0xFF);

    let mut zl = ZipList::from_bytes(data).unwrap();
    assert_eq!(zl.len(), count);

    zl.delete_range(0, 10).unwrap();
    assert_eq!(zl.len(), count - 10);
    assert_eq!(zl.as_bytes()[8..10], u16::MAX.to_le_bytes());

    assert_eq!(zl.refresh_len(), count - 10);
    assert_eq!(zl.as_bytes()[8..10], ((count - 10) as u16).to_le_bytes());
    assert_eq!(zl.len(), count - 10);
}

/// Тест проверяет отладочный вывод.
#[test]
fn test_debug_dump() {
    let mut zl = ZipList::new();
    zl.push(b"hello", Where::Tail).unwrap();
    zl.push(b"1024", Where::Tail).unwrap();

    let dump = format!("{zl:?}");
    assert!(dump.contains("{length 2}"));
    assert!(dump.contains("[hello]"));
    assert!(dump.contains("[1024]"));
    assert!(dump.ends_with("{end}"));
}
